use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error taxonomy for the storage layer. Mirrors the Redis Gateway's failure
/// semantics: `NotFound`, `Conflict` (optimistic check failure), `Transient`
/// (retry-eligible), `Fatal` (auth, misconfig, bug). The HTTP layer maps
/// these onto the richer service-level taxonomy; this crate never knows
/// about status codes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient redis failure: {0}")]
    Transient(redis::RedisError),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Transient errors are the only ones the gateway retries; everything
    /// above this crate treats a non-retryable error as final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::Transient(_) => "transient",
            StoreError::Fatal(_) => "fatal",
            StoreError::Validation(_) => "validation",
            StoreError::Serialization(_) => "serialization",
        }
    }
}

/// `redis::RedisError` covers everything from a dropped connection to a bad
/// `AUTH` password under one type; this reclassifies it onto the taxonomy's
/// `Transient`/`Fatal` split so auth and misconfiguration errors surface as
/// unrecoverable rather than being retried three times for nothing.
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        use redis::ErrorKind;
        match err.kind() {
            ErrorKind::AuthenticationFailed | ErrorKind::InvalidClientConfig => {
                StoreError::Fatal(err.to_string())
            }
            _ if err.is_connection_refusal() || err.is_unrecoverable_error() => {
                StoreError::Fatal(err.to_string())
            }
            _ => StoreError::Transient(err),
        }
    }
}
