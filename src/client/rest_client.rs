use super::error::FetchError;
use crate::models::alert::{AlertQuery, AlertsResponse};
use crate::views::ViewKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Ключи, под которыми бэкенд возвращает списки
const LIST_KEYS: [&str; 3] = ["items", "workflows", "assets"];

#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// GET /api/alerts
    async fn fetch_alerts(&self, query: &AlertQuery) -> Result<AlertsResponse, FetchError>;

    /// GET for one of the list views; the list itself is opaque.
    async fn fetch_list(&self, view: ViewKind) -> Result<Vec<Value>, FetchError>;
}

pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<Q: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            FetchError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Backend returned {} for {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DashboardBackend for RestClient {
    async fn fetch_alerts(&self, query: &AlertQuery) -> Result<AlertsResponse, FetchError> {
        let body = self.get_json(ViewKind::Alerts.backend_path(), query).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn fetch_list(&self, view: ViewKind) -> Result<Vec<Value>, FetchError> {
        let body = self
            .get_json(view.backend_path(), view.backend_query())
            .await?;
        extract_list(view, body)
    }
}

/// Accepts a bare array or an object carrying the list under a known key.
pub fn extract_list(view: ViewKind, body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut fields) => LIST_KEYS
            .iter()
            .find_map(|key| match fields.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                FetchError::UnexpectedShape(format!("{} response has no list field", view))
            }),
        other => Err(FetchError::UnexpectedShape(format!(
            "{} response is {}",
            view,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn alerts(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let asset = params.get("asset_code").cloned().unwrap_or_else(|| "AAPL".into());
        Json(json!({
            "alerts": [{
                "id": "1",
                "alert_type": "combo",
                "asset_code": asset.clone(),
                "country_code": null,
                "date": "2024-01-02T10:00:00Z",
                "data": {}
            }],
            "total_count": 1,
            "available_filters": {
                "asset_codes": [asset.clone(), asset],
                "alert_types": ["combo"],
                "country_codes": []
            }
        }))
    }

    async fn workflows(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let paged = params.get("page").map(String::as_str) == Some("1")
            && params.get("per_page").map(String::as_str) == Some("1000");
        Json(json!({ "workflows": [{ "id": "wf", "paged": paged }], "total": 1 }))
    }

    async fn serve() -> RestClient {
        let app = Router::new()
            .route("/api/alerts", get(alerts))
            .route("/api/workflow/workflows", get(workflows))
            .route(
                "/api/watchlist",
                get(|| async { Json(json!({ "items": [{ "asset_symbol": "AAPL" }] })) }),
            )
            .route("/api/homepage", get(|| async { Json(json!({ "total": 0 })) }))
            .route(
                "/api/indexes",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RestClient::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_alerts_passes_query() {
        let client = serve().await;
        let query = AlertQuery {
            asset_code: Some("BTC".into()),
            ..AlertQuery::default()
        };

        let response = client.fetch_alerts(&query).await.unwrap();
        assert_eq!(response.alerts.len(), 1);
        assert_eq!(response.alerts[0].asset_code, "BTC");
        assert_eq!(response.available_filters.asset_codes, vec!["BTC", "BTC"]);
    }

    #[tokio::test]
    async fn test_fetch_list_reads_items_and_workflows() {
        let client = serve().await;

        let watchlist = client.fetch_list(ViewKind::Watchlist).await.unwrap();
        assert_eq!(watchlist, vec![json!({ "asset_symbol": "AAPL" })]);

        let workflows = client.fetch_list(ViewKind::Workflows).await.unwrap();
        assert_eq!(workflows, vec![json!({ "id": "wf", "paged": true })]);
    }

    #[tokio::test]
    async fn test_server_error_becomes_status_error() {
        let client = serve().await;
        let err = client.fetch_list(ViewKind::Indexes).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, ref body } if body == "boom"));
    }

    #[tokio::test]
    async fn test_missing_route_and_bad_shape() {
        let client = serve().await;

        let err = client.fetch_list(ViewKind::LongTerm).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));

        let err = client.fetch_list(ViewKind::Homepage).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape(_)));
    }

    #[test]
    fn test_extract_list_shapes() {
        assert_eq!(
            extract_list(ViewKind::Indexes, json!([1, 2])).unwrap(),
            vec![json!(1), json!(2)]
        );
        assert_eq!(
            extract_list(ViewKind::Indexes, json!({ "items": [3] })).unwrap(),
            vec![json!(3)]
        );
        assert!(extract_list(ViewKind::Indexes, json!({ "items": "nope" })).is_err());
        assert!(extract_list(ViewKind::Indexes, json!("text")).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RestClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
