pub mod alerts;
pub mod polling;
