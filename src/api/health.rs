use axum::{Json, extract::Extension, http::StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

use crate::app_state::models::AppState;
use crate::views::ViewKind;

/// Живость сервиса и окружение, в котором он запущен
pub async fn health_api(Extension(app_state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "env": app_state.settings.app_env.env.to_string(),
    }))
}

/// OK only while no mounted view is showing a fetch error, i.e. the REST
/// backend answered the last attempt of every view.
pub async fn health_backend(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<StatusCode, StatusCode> {
    let views = &app_state.views;

    let mut failing = Vec::new();
    if views.is_mounted(ViewKind::Alerts) && views.alerts().error.is_some() {
        failing.push(ViewKind::Alerts);
    }
    for view in ViewKind::LISTS {
        let has_error = views
            .list(view)
            .map(|snapshot| snapshot.error.is_some())
            .unwrap_or(false);
        if views.is_mounted(view) && has_error {
            failing.push(view);
        }
    }

    if failing.is_empty() {
        Ok(StatusCode::OK)
    } else {
        warn!("Backend health check failed for views: {:?}", failing);
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
