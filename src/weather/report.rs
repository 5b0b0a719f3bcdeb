//! Weather report model and its text rendering.

use serde::{Deserialize, Serialize};

/// Field names a report may carry, in rendering order.
pub const REPORT_FIELDS: [&str; 7] = [
    "region",
    "status",
    "temperature",
    "sensible_temperature",
    "humidity",
    "source",
    "timestamp",
];

/// Current conditions for one region as scraped from the search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub region: String,
    pub status: Option<String>,
    pub temperature: Option<String>,
    pub sensible_temperature: Option<String>,
    pub humidity: Option<String>,
    pub source: String,
    /// Unix seconds at which the page was parsed
    pub timestamp: i64,
}

impl WeatherReport {
    /// Whether none of the weather fields could be extracted.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.temperature.is_none()
            && self.sensible_temperature.is_none()
            && self.humidity.is_none()
    }

    /// Human readable multi-line rendering used as the default tool output.
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("[네이버 날씨] {}", self.region)];

        let labelled = [
            ("상태", &self.status),
            ("기온", &self.temperature),
            ("체감온도", &self.sensible_temperature),
            ("습도", &self.humidity),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                lines.push(format!("- {label}: {value}"));
            }
        }

        if self.is_empty() {
            lines.push(
                "- 안내: 일부 정보 수집에 실패했습니다. 잠시 후 다시 시도해 주세요.".to_string(),
            );
        }
        lines.push(format!("- 참고: {}", self.source));

        lines.join("\n")
    }
}
