use super::kind::ViewKind;
use crate::client::error::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Что видит слой отображения для одного представления
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot<T> {
    pub view: ViewKind,
    pub data: Option<T>,
    /// Сообщение для пользователя о последней неудаче; сбрасывается при успехе
    pub error: Option<String>,
    pub loading: bool,
    pub last_fetch_time: Option<DateTime<Utc>>,
    pub attempts: u64,
    pub failures: u64,
}

/// Кэш данных одного представления. У каждого представления своё хранилище
#[derive(Debug)]
pub struct ViewStore<T> {
    inner: RwLock<ViewSnapshot<T>>,
}

impl<T: Clone> ViewStore<T> {
    pub fn new(view: ViewKind) -> Self {
        Self {
            inner: RwLock::new(ViewSnapshot {
                view,
                data: None,
                error: None,
                loading: false,
                last_fetch_time: None,
                attempts: 0,
                failures: 0,
            }),
        }
    }

    pub fn begin(&self) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.loading = true;
        state.attempts += 1;
    }

    /// Успех заменяет данные целиком; неудача сохраняет прежние данные и
    /// записывает ошибку один раз
    pub fn apply(&self, outcome: Result<T, FetchError>) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.loading = false;
        match outcome {
            Ok(data) => {
                state.data = Some(data);
                state.error = None;
                state.last_fetch_time = Some(Utc::now());
                debug!("View {} updated", state.view);
            }
            Err(err) => {
                state.failures += 1;
                state.error = Some(format!("Failed to load {}: {}", state.view, err.user_message()));
            }
        }
    }

    /// Запрос прерван остановкой опроса: снимаем признак загрузки, данные не трогаем
    pub fn discard(&self) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.loading = false;
    }

    pub fn snapshot(&self) -> ViewSnapshot<T> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
