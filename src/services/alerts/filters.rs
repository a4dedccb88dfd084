use crate::models::alert::AlertEvent;
use serde::Deserialize;

/// Client-side narrowing applied on top of processed alerts.
/// An empty or absent value leaves that field unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub alert_type: Option<String>,
}

impl AlertFilter {
    pub fn is_active(&self) -> bool {
        active(&self.asset_code).is_some() || active(&self.alert_type).is_some()
    }

    pub fn matches(&self, alert: &AlertEvent) -> bool {
        if let Some(code) = active(&self.asset_code) {
            if alert.asset_code != code {
                return false;
            }
        }
        if let Some(kind) = active(&self.alert_type) {
            if alert.alert_type != kind {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, alerts: &[AlertEvent]) -> Vec<AlertEvent> {
        alerts.iter().filter(|a| self.matches(a)).cloned().collect()
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
