use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("HTTP {status} for {query}")]
    FetchStatus { query: String, status: u16 },

    #[error("Document not found in cache: {0}")]
    NotFound(String),

    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Coder not found in directory: {0}")]
    CoderNotFound(String),

    #[error("No result entry for coder {coder_id} in round {round_id}")]
    JoinMiss { round_id: u64, coder_id: u64 },

    #[error("Round mismatch: expected round {expected}, got {found}")]
    RoundMismatch { expected: u64, found: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),
}

impl AppError {
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Parse {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
