use super::app_env::Env;
use crate::models::alert::AlertQuery;
use crate::services::polling::{PollingConfig, RefreshOnVisible, TickGate};
use crate::views::ViewKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown view in [views] section: {0}")]
    UnknownView(String),
    #[error("polling interval for {0} must be greater than zero")]
    ZeroInterval(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub log: LogConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    pub polling: PollingSection,
    /// Переопределения политики опроса для отдельных представлений
    #[serde(default)]
    pub views: HashMap<String, ViewPollingOverride>,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: f64,
    // Необязательное сужение выборки на стороне бэкенда
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub alert_type: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            asset_code: None,
            alert_type: None,
            country_code: None,
        }
    }
}

impl AlertsConfig {
    pub fn backend_query(&self) -> AlertQuery {
        AlertQuery {
            asset_code: self.asset_code.clone(),
            alert_type: self.alert_type.clone(),
            country_code: self.country_code.clone(),
        }
    }
}

fn default_max_age_hours() -> f64 {
    crate::services::alerts::processor::DEFAULT_MAX_AGE_HOURS
}

#[derive(Debug, Deserialize)]
pub struct PollingSection {
    pub interval_seconds: u64,
    #[serde(default)]
    pub tick_gate: TickGate,
    #[serde(default)]
    pub refresh_on_visible: RefreshOnVisible,
    /// Считать ли представления видимыми сразу после монтирования
    #[serde(default = "default_enabled")]
    pub start_visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct ViewPollingOverride {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub interval_seconds: Option<u64>,
    pub tick_gate: Option<TickGate>,
    pub refresh_on_visible: Option<RefreshOnVisible>,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Загружает config/{env}.toml
    pub fn new(env: &Env) -> Self {
        let path = format!("config/{}.toml", env);
        Self::from_file(&path).unwrap_or_else(|err| panic!("Invalid configuration: {}", err))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::ZeroInterval("[polling]".to_string()));
        }
        for (name, view) in &self.views {
            if name.parse::<ViewKind>().is_err() {
                return Err(ConfigError::UnknownView(name.clone()));
            }
            if view.interval_seconds == Some(0) {
                return Err(ConfigError::ZeroInterval(name.clone()));
            }
        }
        Ok(())
    }

    /// Returns false when the view is switched off in the [views] section.
    pub fn is_view_enabled(&self, view: ViewKind) -> bool {
        self.views
            .get(view.slug())
            .map(|o| o.enabled)
            .unwrap_or(true)
    }

    /// Resolves the effective polling policy for a view: the global
    /// [polling] section with the per-view override applied on top.
    pub fn polling_for(&self, view: ViewKind) -> PollingConfig {
        let view_override = self.views.get(view.slug());

        let interval_seconds = view_override
            .and_then(|o| o.interval_seconds)
            .unwrap_or(self.polling.interval_seconds);
        let tick_gate = view_override
            .and_then(|o| o.tick_gate)
            .unwrap_or(self.polling.tick_gate);
        let refresh_on_visible = view_override
            .and_then(|o| o.refresh_on_visible)
            .unwrap_or(self.polling.refresh_on_visible);

        PollingConfig {
            period: Duration::from_secs(interval_seconds),
            tick_gate,
            refresh_on_visible,
        }
    }
}
