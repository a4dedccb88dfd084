pub mod error;
pub mod rest_client;

pub use error::FetchError;
pub use rest_client::{DashboardBackend, RestClient};
