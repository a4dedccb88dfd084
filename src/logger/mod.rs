mod config;

pub use config::init_logger;
