use super::kind::ViewKind;
use super::store::{ViewSnapshot, ViewStore};
use super::tasks::{AlertsData, AlertsRefresh, ListRefresh};
use crate::client::DashboardBackend;
use crate::env_config::models::app_config::AppConfig;
use crate::services::alerts::AlertProcessor;
use crate::services::polling::{MarketGate, PollingController, PollingHandle, PollingState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Все смонтированные представления: их хранилища и контроллеры опроса
pub struct ViewRegistry {
    alerts: Arc<ViewStore<AlertsData>>,
    lists: HashMap<ViewKind, Arc<ViewStore<Vec<Value>>>>,
    handles: Mutex<HashMap<ViewKind, PollingHandle>>,
}

impl ViewRegistry {
    /// Монтирует все включённые представления: у каждого своё хранилище и
    /// контроллер, первичная загрузка стартует сразу
    pub fn mount(
        config: &AppConfig,
        backend: Arc<dyn DashboardBackend>,
        gate: Arc<dyn MarketGate>,
        visible: bool,
    ) -> Self {
        let alerts = Arc::new(ViewStore::new(ViewKind::Alerts));
        let lists: HashMap<_, _> = ViewKind::LISTS
            .into_iter()
            .map(|view| (view, Arc::new(ViewStore::new(view))))
            .collect();

        let mut handles = HashMap::new();

        if config.is_view_enabled(ViewKind::Alerts) {
            let task = AlertsRefresh::new(
                backend.clone(),
                AlertProcessor::new(config.alerts.max_age_hours),
                config.alerts.backend_query(),
                alerts.clone(),
            );
            let polling = config.polling_for(ViewKind::Alerts);
            handles.insert(
                ViewKind::Alerts,
                PollingController::spawn(task, polling, gate.clone(), visible),
            );
        }

        for (view, store) in &lists {
            if !config.is_view_enabled(*view) {
                info!("View {} is disabled in configuration", view);
                continue;
            }
            let task = ListRefresh::new(*view, backend.clone(), store.clone());
            let polling = config.polling_for(*view);
            handles.insert(
                *view,
                PollingController::spawn(task, polling, gate.clone(), visible),
            );
        }

        info!("Mounted {} views", handles.len());

        Self {
            alerts,
            lists,
            handles: Mutex::new(handles),
        }
    }

    pub fn alerts(&self) -> ViewSnapshot<AlertsData> {
        self.alerts.snapshot()
    }

    pub fn list(&self, view: ViewKind) -> Option<ViewSnapshot<Vec<Value>>> {
        self.lists.get(&view).map(|store| store.snapshot())
    }

    pub fn is_mounted(&self, view: ViewKind) -> bool {
        self.lock_handles().contains_key(&view)
    }

    pub fn polling_state(&self, view: ViewKind) -> Option<PollingState> {
        self.lock_handles().get(&view).map(PollingHandle::state)
    }

    /// None, если представление не смонтировано
    pub fn is_visible(&self, view: ViewKind) -> Option<bool> {
        self.lock_handles().get(&view).map(PollingHandle::is_visible)
    }

    /// false, если представление не смонтировано
    pub fn set_visible(&self, view: ViewKind, visible: bool) -> bool {
        match self.lock_handles().get(&view) {
            Some(handle) => {
                handle.set_visible(visible);
                true
            }
            None => false,
        }
    }

    /// Ручной повтор. false, если представление не смонтировано
    pub fn refresh_now(&self, view: ViewKind) -> bool {
        self.lock_handles()
            .get(&view)
            .map(PollingHandle::refresh_now)
            .unwrap_or(false)
    }

    /// Останавливает опрос одного представления. Хранилище остаётся, его
    /// последний снимок по-прежнему доступен. false, если не было смонтировано
    pub async fn unmount(&self, view: ViewKind) -> bool {
        let handle = self.lock_handles().remove(&view);
        match handle {
            Some(handle) => {
                let name = handle.name().to_string();
                handle.shutdown().await;
                info!("View {} unmounted", name);
                true
            }
            None => false,
        }
    }

    pub async fn shutdown(&self) {
        let handles: Vec<PollingHandle> = self.lock_handles().drain().map(|(_, h)| h).collect();
        info!("Stopping {} polling controllers", handles.len());
        for handle in handles {
            debug!("Stopping polling for {}", handle.name());
            handle.shutdown().await;
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, HashMap<ViewKind, PollingHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
