use thiserror::Error;

/// Ошибка обращения к REST бэкенду
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl FetchError {
    /// Short message suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => "Backend is unreachable".to_string(),
            FetchError::Status { status, .. } if *status >= 500 => {
                format!("Backend error ({})", status)
            }
            FetchError::Status { status, .. } => format!("Request rejected ({})", status),
            FetchError::Decode(_) | FetchError::UnexpectedShape(_) => {
                "Backend sent an unreadable response".to_string()
            }
        }
    }
}
