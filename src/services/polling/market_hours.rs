use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Weekday};

/// Отвечает на вопрос «открыт ли рынок сейчас» для гейта опроса
pub trait MarketGate: Send + Sync {
    fn is_open(&self) -> bool;
}

/// Эвристическое окно торговой сессии: будни, 09:00–17:30 по локальному времени.
/// Праздники и календари бирж не учитываются.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    open: NaiveTime,
    close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).expect("valid open time"),
            close: NaiveTime::from_hms_opt(17, 30, 0).expect("valid close time"),
        }
    }
}

impl MarketHours {
    /// Открытие включительно, закрытие не включительно
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = at.time();
        self.open <= time && time < self.close
    }
}

impl MarketGate for MarketHours {
    fn is_open(&self) -> bool {
        self.is_open_at(Local::now().naive_local())
    }
}

/// Проверка по текущему локальному времени
pub fn is_market_open() -> bool {
    MarketHours::default().is_open()
}
