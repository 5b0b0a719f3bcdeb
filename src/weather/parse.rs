//! Extraction of current conditions from a Naver search result page.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::FetchError;
use crate::weather::WeatherReport;

// Selector lists are tried in order; the page layout changes from time to
// time, so each field has fallbacks.
const TEMP_PRIMARY: &[&str] = &[".temperature_text > strong"];
const TEMP_FALLBACK: &[&str] = &["span.temperature_text strong", ".temperature_text"];
const STATUS_PRIMARY: &[&str] = &[".weather_main"];
const STATUS_FALLBACK: &[&str] = &[".status .weather", ".status", ".weather"];
const SENSIBLE_TEMP: &[&str] = &[".temperature_info .sensible em"];
const HUMIDITY_BLOCKS: &[&str] = &[".summary_list", ".weather_info", ".temperature_info"];

fn humidity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"습도\s*([0-9]{1,3})\s*%?").expect("humidity pattern is valid"))
}

fn leading_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\d+\-]*").expect("label pattern is valid"))
}

/// Parses `html` into a report for `region`.
///
/// Missing fields are left as `None`; only an invalid selector is an error.
pub fn parse_weather(
    html: &str,
    region: &str,
    source: &str,
    timestamp: i64,
) -> Result<WeatherReport, FetchError> {
    let document = Html::parse_document(html);

    let temperature = match first_text(&document, TEMP_PRIMARY)? {
        Some(text) => Some(text),
        None => first_text(&document, TEMP_FALLBACK)?,
    };
    let status = match first_text(&document, STATUS_PRIMARY)? {
        Some(text) => Some(text),
        None => first_text(&document, STATUS_FALLBACK)?,
    };

    Ok(WeatherReport {
        region: region.to_string(),
        status,
        temperature: temperature.map(|t| normalize_temperature(&t)),
        sensible_temperature: first_text(&document, SENSIBLE_TEMP)?,
        humidity: guess_humidity(&document)?,
        source: source.to_string(),
        timestamp,
    })
}

/// Turns strings such as `"현재 온도22.7°"` or `"+3도"` into `"22.7°C"` / `"3°C"`.
pub fn normalize_temperature(raw: &str) -> String {
    let without_label = leading_label_pattern().replace(raw, "");
    let cleaned: String = without_label
        .chars()
        .filter(|c| !matches!(c, '도' | ' ' | '°'))
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if cleaned.is_empty() {
        raw.to_string()
    } else {
        format!("{cleaned}°C")
    }
}

fn first_text(document: &Html, selectors: &[&str]) -> Result<Option<String>, FetchError> {
    for raw in selectors {
        let selector = compile(raw)?;
        if let Some(element) = document.select(&selector).next() {
            let text = joined_text(element, "");
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

fn guess_humidity(document: &Html) -> Result<Option<String>, FetchError> {
    for raw in HUMIDITY_BLOCKS {
        let selector = compile(raw)?;
        let Some(block) = document.select(&selector).next() else {
            continue;
        };
        let text = joined_text(block, " ");
        if let Some(captures) = humidity_pattern().captures(&text) {
            return Ok(Some(format!("{}%", &captures[1])));
        }
    }
    Ok(None)
}

/// Trimmed, non-empty text nodes of `element` joined with `separator`.
fn joined_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn compile(raw: &str) -> Result<Selector, FetchError> {
    Selector::parse(raw)
        .map_err(|e| FetchError::Parse(format!("invalid CSS selector '{raw}': {e}")))
}
