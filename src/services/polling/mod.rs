pub mod config;
pub mod controller;
pub mod market_hours;
pub mod schedule;

pub use config::{PollingConfig, RefreshOnVisible, TickGate};
pub use controller::{PollingController, PollingHandle, RefreshTask};
pub use market_hours::{is_market_open, MarketGate, MarketHours};
pub use schedule::PollingState;
