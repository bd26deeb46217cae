use thiserror::Error;

/// Errors raised by link and click storage backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Outcome of a failed ownership check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("link not found")]
    LinkNotFound,
    #[error("requester does not own this link")]
    Unauthorized,
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("expiration is out of range")]
    InvalidExpiration,
    #[error("invalid short code length {length}; expected {min}..={max}")]
    InvalidCodeLength { length: usize, min: usize, max: usize },
    #[error("alias already exists: {0}")]
    AliasAlreadyExists(String),
    #[error("no free short code found after {attempts} attempts")]
    AllocationExhausted { attempts: usize },
    #[error("link not found")]
    LinkNotFound,
    #[error("requester does not own this link")]
    Unauthorized,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Error)]
pub enum RedirectError {
    #[error("link not found")]
    LinkNotFound,
    #[error("link has expired")]
    LinkExpired,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error("link not found")]
    LinkNotFound,
    #[error("requester does not own this link")]
    Unauthorized,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<AccessError> for ShortenerError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::LinkNotFound => Self::LinkNotFound,
            AccessError::Unauthorized => Self::Unauthorized,
        }
    }
}

impl From<AccessError> for AnalyticsError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::LinkNotFound => Self::LinkNotFound,
            AccessError::Unauthorized => Self::Unauthorized,
        }
    }
}
