pub mod filters;
pub mod processor;

pub use filters::AlertFilter;
pub use processor::{sort_alerts, AlertProcessor, AlertSort};
