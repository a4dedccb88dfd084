use serde::Deserialize;
use std::time::Duration;

/// Стандартный период опроса
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Какие тики таймера могут запускать загрузку
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickGate {
    /// Только в рыночные часы
    #[default]
    MarketHours,
    Always,
}

/// Что делать, когда представление снова стало видимым при остановленном таймере
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOnVisible {
    Always,
    #[default]
    WhenMarketOpen,
    /// Рынок открыт и последняя успешная загрузка старше одного периода
    WhenStale,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub period: Duration,
    pub tick_gate: TickGate,
    pub refresh_on_visible: RefreshOnVisible,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            tick_gate: TickGate::default(),
            refresh_on_visible: RefreshOnVisible::default(),
        }
    }
}
