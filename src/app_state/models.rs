use crate::env_config::models::app_setting::AppSettings;
use crate::views::ViewRegistry;

use std::sync::Arc;

pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub views: Arc<ViewRegistry>,
}

impl AppState {
    pub fn new(settings: Arc<AppSettings>, views: Arc<ViewRegistry>) -> Self {
        Self { settings, views }
    }
}
