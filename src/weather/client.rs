//! HTTP client for the Naver search weather module.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::gate::RateGate;
use crate::weather::{parse_weather, WeatherReport, WeatherSource};

/// Search endpoint queried with `<region> 날씨`.
pub const SEARCH_URL: &str = "https://search.naver.com/search.naver";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9";

/// First retry delay; doubles on every further attempt.
pub const BACKOFF_BASE: Duration = Duration::from_millis(800);

/// Fetches and parses weather pages, retrying transient failures.
///
/// Retries go back through the shared rate gate; the first attempt relies
/// on the permit the caller already took.
#[derive(Clone)]
pub struct NaverWeatherClient {
    http: Client,
    gate: Arc<RateGate>,
    base_url: Url,
    max_retries: u32,
    backoff_base: Duration,
}

impl NaverWeatherClient {
    pub fn new(config: &Config, gate: Arc<RateGate>) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FetchError::Internal(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(SEARCH_URL)
            .map_err(|e| FetchError::Internal(format!("invalid search URL: {e}")))?;

        Ok(Self {
            http,
            gate,
            base_url,
            max_retries: config.max_retries.max(1),
            backoff_base: BACKOFF_BASE,
        })
    }

    /// Points the client at another search endpoint.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Search URL for the weather of `region`.
    pub fn search_url(&self, region: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("query", &format!("{region} 날씨"));
        url
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Downloads and parses the weather for `region`.
    pub async fn fetch_report(&self, region: &str) -> Result<WeatherReport, FetchError> {
        let url = self.search_url(region);
        let html = self.fetch_html(&url).await?;
        parse_weather(&html, region, url.as_str(), chrono::Utc::now().timestamp())
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                self.gate.acquire().await;
            }

            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        error = %err,
                        backoff_ms = delay.as_millis() as u64,
                        "fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(&self, url: &Url) -> Result<String, FetchError> {
        debug!(%url, "requesting search page");
        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

impl WeatherSource for NaverWeatherClient {
    fn fetch(&self, region: String) -> BoxFuture<'static, Result<WeatherReport, FetchError>> {
        let client = self.clone();
        async move { client.fetch_report(&region).await }.boxed()
    }
}
