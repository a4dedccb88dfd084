use super::kind::ViewKind;
use super::store::ViewStore;
use crate::client::{DashboardBackend, FetchError};
use crate::models::alert::{AlertEvent, AlertQuery, AvailableFilters};
use crate::services::alerts::{AlertProcessor, AlertSort};
use crate::services::polling::RefreshTask;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Обработанный снимок ленты сигналов
#[derive(Debug, Clone, Serialize)]
pub struct AlertsData {
    /// После фильтра давности и дедупликации, новые сверху
    pub alerts: Vec<AlertEvent>,
    pub available_filters: AvailableFilters,
    /// Сколько сигналов пришло от бэкенда до обработки
    pub received: usize,
}

pub struct AlertsRefresh {
    backend: Arc<dyn DashboardBackend>,
    processor: AlertProcessor,
    query: AlertQuery,
    store: Arc<ViewStore<AlertsData>>,
}

impl AlertsRefresh {
    /// `query` сужает выборку на стороне бэкенда (параметры из секции [alerts])
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        processor: AlertProcessor,
        query: AlertQuery,
        store: Arc<ViewStore<AlertsData>>,
    ) -> Self {
        Self {
            backend,
            processor,
            query,
            store,
        }
    }
}

#[async_trait]
impl RefreshTask for AlertsRefresh {
    type Output = AlertsData;

    fn name(&self) -> &str {
        ViewKind::Alerts.slug()
    }

    fn begin(&self) {
        self.store.begin();
    }

    async fn fetch(&self) -> Result<AlertsData, FetchError> {
        let response = self.backend.fetch_alerts(&self.query).await?;
        let received = response.alerts.len();
        let alerts = self.processor.process(response.alerts, AlertSort::Recency);

        info!(
            "Alerts refreshed: {} received, {} displayed (window {}h)",
            received,
            alerts.len(),
            self.processor.max_age_hours()
        );

        Ok(AlertsData {
            alerts,
            available_filters: response.available_filters.deduplicated(),
            received,
        })
    }

    fn apply(&self, outcome: Result<AlertsData, FetchError>) {
        self.store.apply(outcome);
    }

    fn discard(&self) {
        self.store.discard();
    }
}

/// Обновление представлений, данные которых приходят непрозрачным списком
pub struct ListRefresh {
    view: ViewKind,
    backend: Arc<dyn DashboardBackend>,
    store: Arc<ViewStore<Vec<Value>>>,
}

impl ListRefresh {
    pub fn new(
        view: ViewKind,
        backend: Arc<dyn DashboardBackend>,
        store: Arc<ViewStore<Vec<Value>>>,
    ) -> Self {
        Self {
            view,
            backend,
            store,
        }
    }
}

#[async_trait]
impl RefreshTask for ListRefresh {
    type Output = Vec<Value>;

    fn name(&self) -> &str {
        self.view.slug()
    }

    fn begin(&self) {
        self.store.begin();
    }

    async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        self.backend.fetch_list(self.view).await
    }

    fn apply(&self, outcome: Result<Vec<Value>, FetchError>) {
        self.store.apply(outcome);
    }

    fn discard(&self) {
        self.store.discard();
    }
}
