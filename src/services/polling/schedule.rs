use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingState {
    /// Таймер не взведён
    Stopped,
    /// Таймер взведён, периодическое обновление разрешено
    Active,
}

/// Состояние обновления представления. Принадлежит одной задаче контроллера
/// и уничтожается вместе с ней
#[derive(Debug)]
pub struct RefreshSchedule {
    id: Uuid,
    period: Duration,
    last_fetch_time: Option<DateTime<Utc>>,
    last_fetch_at: Option<Instant>,
    ticker: Option<Interval>,
    is_visible: bool,
}

impl RefreshSchedule {
    pub fn new(period: Duration, is_visible: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            period,
            last_fetch_time: None,
            last_fetch_at: None,
            ticker: None,
            is_visible,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PollingState {
        if self.ticker.is_some() {
            PollingState::Active
        } else {
            PollingState::Stopped
        }
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_time
    }

    /// Взводит периодический таймер; первый тик через один период
    pub fn arm(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        // Пропущенные во время запроса тики не догоняются
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    pub fn disarm(&mut self) {
        self.ticker = None;
    }

    /// Ждёт следующего тика; при остановленном таймере ждёт бесконечно
    pub async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub fn record_fetch(&mut self) {
        self.last_fetch_time = Some(Utc::now());
        self.last_fetch_at = Some(Instant::now());
    }

    /// Успешных загрузок ещё не было или последняя не моложе одного периода
    pub fn is_stale(&self) -> bool {
        match self.last_fetch_at {
            Some(at) => at.elapsed() >= self.period,
            None => true,
        }
    }
}
