use crate::app_state::models::AppState;
use crate::models::alert::{alert_type_label, AlertEvent, AvailableFilters};
use crate::services::alerts::{sort_alerts, AlertFilter, AlertSort};
use crate::services::polling::PollingState;
use crate::views::{ViewKind, ViewSnapshot};
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown view: {0}")]
    UnknownView(String),
    #[error("view {0} is not mounted")]
    NotMounted(ViewKind),
    #[error("alerts are served from /alerts")]
    NotAList,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownView(_) | ApiError::NotAList => StatusCode::NOT_FOUND,
            ApiError::NotMounted(_) => StatusCode::CONFLICT,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn parse_view(raw: &str) -> Result<ViewKind, ApiError> {
    raw.parse::<ViewKind>()
        .map_err(|_| ApiError::UnknownView(raw.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsParams {
    pub asset_code: Option<String>,
    pub alert_type: Option<String>,
    #[serde(default)]
    pub sort: AlertSort,
}

/// Ответ ленты сигналов для слоя отображения
#[derive(Debug, Serialize)]
pub struct AlertsView {
    pub alerts: Vec<AlertEvent>,
    /// Alerts after processing, before the reader's filters.
    pub total_count: usize,
    pub filtered: bool,
    pub available_filters: AvailableFilters,
    /// Display names for the alert types in `available_filters`.
    pub alert_type_labels: BTreeMap<String, String>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_fetch_time: Option<DateTime<Utc>>,
}

pub async fn get_alerts(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(params): Query<AlertsParams>,
) -> Json<AlertsView> {
    let snapshot = app_state.views.alerts();
    let filter = AlertFilter {
        asset_code: params.asset_code,
        alert_type: params.alert_type,
    };

    let (processed, available_filters) = match snapshot.data {
        Some(data) => (data.alerts, data.available_filters),
        None => (Vec::new(), AvailableFilters::default()),
    };

    let mut alerts = filter.apply(&processed);
    if params.sort != AlertSort::Recency {
        sort_alerts(&mut alerts, params.sort);
    }
    debug!("Serving {} of {} alerts", alerts.len(), processed.len());

    let alert_type_labels = available_filters
        .alert_types
        .iter()
        .map(|t| (t.clone(), alert_type_label(t).to_string()))
        .collect();

    Json(AlertsView {
        alerts,
        total_count: processed.len(),
        filtered: filter.is_active(),
        available_filters,
        alert_type_labels,
        error: snapshot.error,
        loading: snapshot.loading,
        last_fetch_time: snapshot.last_fetch_time,
    })
}

#[derive(Debug, Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub snapshot: ViewSnapshot<Vec<Value>>,
    pub polling: PollingState,
    pub visible: bool,
}

pub async fn get_view(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(view): Path<String>,
) -> Result<Json<ListView>, ApiError> {
    let view = parse_view(&view)?;
    let snapshot = app_state.views.list(view).ok_or(ApiError::NotAList)?;
    let polling = app_state
        .views
        .polling_state(view)
        .ok_or(ApiError::NotMounted(view))?;
    let visible = app_state
        .views
        .is_visible(view)
        .ok_or(ApiError::NotMounted(view))?;

    Ok(Json(ListView {
        snapshot,
        polling,
        visible,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

pub async fn put_visibility(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(view): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Result<StatusCode, ApiError> {
    let view = parse_view(&view)?;
    if !app_state.views.set_visible(view, request.visible) {
        return Err(ApiError::NotMounted(view));
    }
    debug!("View {} visibility -> {}", view, request.visible);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_refresh(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(view): Path<String>,
) -> Result<StatusCode, ApiError> {
    let view = parse_view(&view)?;
    if !app_state.views.refresh_now(view) {
        return Err(ApiError::NotMounted(view));
    }
    info!("Manual refresh requested for {}", view);
    Ok(StatusCode::ACCEPTED)
}

/// Размонтирование представления: опрос останавливается, повторный вызов даёт 409
pub async fn delete_view(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(view): Path<String>,
) -> Result<StatusCode, ApiError> {
    let view = parse_view(&view)?;
    if !app_state.views.unmount(view).await {
        return Err(ApiError::NotMounted(view));
    }
    info!("View {} unmounted on request", view);
    Ok(StatusCode::NO_CONTENT)
}
