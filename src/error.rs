#[derive(Debug, thiserror::Error)]
pub enum SiftError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("oracle backend error: {0}")]
    OracleBackend(String),

    /// Request-level timeout. Recoverable: the executor treats this exactly
    /// like a parse failure and retries by halving the batch.
    #[error("oracle request timed out")]
    OracleTimeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SiftError {
    /// Whether the retry-by-halving path may absorb this error.
    /// Transport/auth failures abort the whole run instead.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OracleTimeout)
    }
}
