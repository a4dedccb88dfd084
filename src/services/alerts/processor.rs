use crate::models::alert::AlertEvent;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Окно актуальности сигналов по умолчанию: 5 дней
pub const DEFAULT_MAX_AGE_HOURS: f64 = 120.0;

/// Terminal ordering applied after deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSort {
    /// Newest first
    #[default]
    Recency,
    /// Strongest `trendSlope` first
    #[serde(alias = "trend")]
    TrendStrength,
}

/// One alert per (asset, country, type). `None` country is its own group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    asset_code: String,
    country_code: Option<String>,
    alert_type: String,
}

impl DedupKey {
    fn of(alert: &AlertEvent) -> Self {
        Self {
            asset_code: alert.asset_code.clone(),
            country_code: alert.country().map(str::to_owned),
            alert_type: alert.alert_type.clone(),
        }
    }
}

struct TimedAlert {
    at: DateTime<Utc>,
    alert: AlertEvent,
}

#[derive(Debug, Clone)]
pub struct AlertProcessor {
    max_age_hours: f64,
    max_age: TimeDelta,
}

impl Default for AlertProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_HOURS)
    }
}

impl AlertProcessor {
    pub fn new(max_age_hours: f64) -> Self {
        // Окно считаем в микросекундах, чтобы граница не терялась при округлении
        let max_age = TimeDelta::microseconds((max_age_hours * 3_600_000_000.0) as i64);
        Self {
            max_age_hours,
            max_age,
        }
    }

    pub fn max_age_hours(&self) -> f64 {
        self.max_age_hours
    }

    /// Фильтрует, дедуплицирует и сортирует сигналы относительно текущего времени
    pub fn process(&self, events: Vec<AlertEvent>, sort: AlertSort) -> Vec<AlertEvent> {
        self.process_at(events, sort, Utc::now())
    }

    /// Same as [`process`](Self::process) with an explicit "now".
    pub fn process_at(
        &self,
        events: Vec<AlertEvent>,
        sort: AlertSort,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let received = events.len();
        let recent = self.filter_recent(events, now);
        let mut deduped = deduplicate(recent);

        match sort {
            AlertSort::Recency => deduped.sort_by(|a, b| b.at.cmp(&a.at)),
            AlertSort::TrendStrength => deduped.sort_by(|a, b| {
                b.alert.trend_slope().total_cmp(&a.alert.trend_slope())
            }),
        }

        debug!(
            "Processed alerts: {} received, {} kept, sort={:?}",
            received,
            deduped.len(),
            sort
        );

        deduped.into_iter().map(|t| t.alert).collect()
    }

    fn filter_recent(&self, events: Vec<AlertEvent>, now: DateTime<Utc>) -> Vec<TimedAlert> {
        events
            .into_iter()
            .filter_map(|alert| {
                let Some(at) = alert.occurred_at_utc() else {
                    match &alert.occurred_at {
                        None => warn!("Invalid date for alert {}: date field is missing", alert.id),
                        Some(raw) => warn!("Invalid date for alert {}: {}", alert.id, raw),
                    }
                    return None;
                };

                (now - at <= self.max_age).then_some(TimedAlert { at, alert })
            })
            .collect()
    }
}

/// Re-orders an already processed list, e.g. when the reader switches
/// between the recency and trend views. Alerts without a parsable date sort
/// last under recency.
pub fn sort_alerts(alerts: &mut [AlertEvent], sort: AlertSort) {
    match sort {
        AlertSort::Recency => alerts.sort_by_key(|a| std::cmp::Reverse(a.occurred_at_utc())),
        AlertSort::TrendStrength => {
            alerts.sort_by(|a, b| b.trend_slope().total_cmp(&a.trend_slope()))
        }
    }
}

/// Keeps the newest alert of each group. An equal timestamp does not replace
/// the alert already kept, so the first one seen wins.
fn deduplicate(alerts: Vec<TimedAlert>) -> Vec<TimedAlert> {
    let mut index: HashMap<DedupKey, usize> = HashMap::new();
    let mut kept: Vec<TimedAlert> = Vec::with_capacity(alerts.len());

    for timed in alerts {
        let key = DedupKey::of(&timed.alert);
        match index.get(&key) {
            Some(&slot) => {
                if timed.at > kept[slot].at {
                    kept[slot] = timed;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(timed);
            }
        }
    }

    kept
}
