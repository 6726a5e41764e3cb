/// Shared error type used across all FineFlow guard crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Project (or its budget record) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network, timeout or 5xx failure talking to the backend. Retryable.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Rejected at the write boundary before anything was persisted.
    #[error("validation: {0}")]
    Validation(String),

    #[error("auth: {0}")]
    Auth(String),

    /// A guarded operation was refused by the enforcement engine.
    #[error("blocked: {0}")]
    Blocked(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller may retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
