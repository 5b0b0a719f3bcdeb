//! Weather Module
//!
//! The underlying fetch behind the weather tool: downloading a Naver search
//! page and extracting current conditions from it.

mod client;
mod parse;
mod report;

use futures::future::BoxFuture;

use crate::error::FetchError;

pub use client::{NaverWeatherClient, BACKOFF_BASE, SEARCH_URL};
pub use parse::{normalize_temperature, parse_weather};
pub use report::{WeatherReport, REPORT_FIELDS};

/// Something that can produce a fresh report for a region.
///
/// Implementations must be interchangeable across calls with the same region
/// since their results are cached.
pub trait WeatherSource: Send + Sync {
    fn fetch(&self, region: String) -> BoxFuture<'static, Result<WeatherReport, FetchError>>;
}
