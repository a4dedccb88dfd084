mod health;
mod views;

pub use health::{health_api, health_backend};
pub use views::{delete_view, get_alerts, get_view, post_refresh, put_visibility};
