use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Представления дашборда, данные которых обновляются периодически
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    Alerts,
    Watchlist,
    WatchlistAll,
    LongTerm,
    Indexes,
    Homepage,
    Workflows,
}

impl ViewKind {
    pub const ALL: [ViewKind; 7] = [
        ViewKind::Alerts,
        ViewKind::Watchlist,
        ViewKind::WatchlistAll,
        ViewKind::LongTerm,
        ViewKind::Indexes,
        ViewKind::Homepage,
        ViewKind::Workflows,
    ];

    /// Все представления, кроме сигналов, отдают непрозрачный список
    pub const LISTS: [ViewKind; 6] = [
        ViewKind::Watchlist,
        ViewKind::WatchlistAll,
        ViewKind::LongTerm,
        ViewKind::Indexes,
        ViewKind::Homepage,
        ViewKind::Workflows,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ViewKind::Alerts => "alerts",
            ViewKind::Watchlist => "watchlist",
            ViewKind::WatchlistAll => "watchlist-all",
            ViewKind::LongTerm => "long-term",
            ViewKind::Indexes => "indexes",
            ViewKind::Homepage => "homepage",
            ViewKind::Workflows => "workflows",
        }
    }

    /// Путь на бэкенде относительно BACKEND_URL
    pub fn backend_path(&self) -> &'static str {
        match self {
            ViewKind::Alerts => "/api/alerts",
            ViewKind::Watchlist => "/api/watchlist",
            ViewKind::WatchlistAll => "/api/watchlist/all",
            ViewKind::LongTerm => "/api/watchlist/long-term",
            ViewKind::Indexes => "/api/indexes",
            ViewKind::Homepage => "/api/homepage",
            ViewKind::Workflows => "/api/workflow/workflows",
        }
    }

    pub fn backend_query(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ViewKind::Workflows => &[("page", "1"), ("per_page", "1000")],
            _ => &[],
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|v| v.slug() == s)
            .ok_or_else(|| format!("unknown view: {}", s))
    }
}
