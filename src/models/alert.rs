use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Сигнал технического анализа, полученный от бэкенда
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: String,
    pub alert_type: String,
    pub asset_code: String,
    #[serde(default)]
    pub country_code: Option<String>,
    /// Сырая строка времени; разбирается при обработке, чтобы битое значение
    /// исключало одно событие, а не весь ответ
    #[serde(rename = "date", default)]
    pub occurred_at: Option<String>,
    #[serde(rename = "data", default)]
    pub payload: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_hours: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradingview_url: Option<String>,
}

/// Payload key holding the trend slope used by the trend-strength ordering.
pub const TREND_SLOPE_KEY: &str = "trendSlope";

impl AlertEvent {
    /// Parses `occurred_at` into an absolute instant.
    pub fn occurred_at_utc(&self) -> Option<DateTime<Utc>> {
        self.occurred_at.as_deref().and_then(parse_timestamp)
    }

    /// Country code with empty strings folded into `None`.
    pub fn country(&self) -> Option<&str> {
        self.country_code.as_deref().filter(|c| !c.is_empty())
    }

    /// Numeric trend slope from the payload; missing or non-numeric is 0.
    pub fn trend_slope(&self) -> f64 {
        self.payload
            .get(TREND_SLOPE_KEY)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

/// Accepts RFC 3339 with an offset, or a naive ISO 8601 timestamp which is
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Человекочитаемое название типа сигнала
pub fn alert_type_label(alert_type: &str) -> &str {
    match alert_type {
        "congestion20" => "Congestion 20",
        "congestion100" => "Congestion 100",
        "combo" => "Combo",
        "double_top" => "Double Top",
        "double_inside_bar" => "Double Inside Bar",
        "containing_candle" => "Containing Candle",
        other => other,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableFilters {
    #[serde(default)]
    pub asset_codes: Vec<String>,
    #[serde(default)]
    pub alert_types: Vec<String>,
    #[serde(default)]
    pub country_codes: Vec<String>,
}

impl AvailableFilters {
    /// The backend may repeat vocabulary entries; keep the first occurrence.
    pub fn deduplicated(self) -> Self {
        Self {
            asset_codes: unique_in_order(self.asset_codes),
            alert_types: unique_in_order(self.alert_types),
            country_codes: unique_in_order(self.country_codes),
        }
    }
}

fn unique_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertEvent>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub available_filters: AvailableFilters,
}

/// Server-side narrowing for GET /api/alerts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}
