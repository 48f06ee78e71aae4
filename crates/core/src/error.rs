//! Error types for fadebin.
//!
//! Display strings carry a stable machine code prefix so that logs and the
//! HTTP boundary can key off them without matching on message text.

use tokio_rusqlite::rusqlite;

use crate::expiry::ExpiryError;

/// Failures surfaced by a durable store.
///
/// The store never retries internally: a constraint clash on insert is a
/// [`StoreError::DuplicateId`], everything else is an opaque
/// [`StoreError::Io`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An entry with this identifier is already stored.
    #[error("DUPLICATE_ID: {0}")]
    DuplicateId(String),

    /// Connectivity, constraint, timeout, or decoding failure.
    #[error("IO_FAILURE: {0}")]
    Io(String),
}

impl StoreError {
    /// Stable machine code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateId(_) => "DUPLICATE_ID",
            StoreError::Io(_) => "IO_FAILURE",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<StoreError>> for StoreError {
    fn from(err: tokio_rusqlite::Error<StoreError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => StoreError::Io("database connection closed".into()),
            tokio_rusqlite::Error::Close(_) => StoreError::Io("failed to close database connection".into()),
            _ => StoreError::Io("database connection closed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for StoreError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            tokio_rusqlite::Error::ConnectionClosed => StoreError::Io("database connection closed".into()),
            tokio_rusqlite::Error::Close(_) => StoreError::Io("failed to close database connection".into()),
            _ => StoreError::Io("database connection closed".into()),
        }
    }
}

/// Errors from the publication service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Publish called with a zero-length body.
    #[error("EMPTY_CONTENT: content cannot be empty")]
    EmptyContent,

    /// Body exceeds the configured size limit.
    #[error("CONTENT_TOO_LARGE: {size} bytes exceeds the limit of {max} bytes")]
    ContentTooLarge { size: usize, max: usize },

    /// Expiry text does not follow the duration grammar.
    #[error("INVALID_EXPIRY: {0}")]
    InvalidExpiry(ExpiryError),

    /// Expiry parsed but falls outside the configured bounds.
    #[error("EXPIRY_OUT_OF_RANGE: {0}")]
    ExpiryOutOfRange(ExpiryError),

    /// Every allocation attempt collided with a live entry.
    #[error("ALLOCATION_EXHAUSTED: no free identifier after {0} attempts")]
    AllocationExhausted(u32),

    /// The durable store failed.
    #[error("STORAGE_FAILURE: {0}")]
    Storage(#[source] StoreError),
}

impl Error {
    /// Stable machine code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Error::EmptyContent => "EMPTY_CONTENT",
            Error::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            Error::InvalidExpiry(_) => "INVALID_EXPIRY",
            Error::ExpiryOutOfRange(_) => "EXPIRY_OUT_OF_RANGE",
            Error::AllocationExhausted(_) => "ALLOCATION_EXHAUSTED",
            Error::Storage(_) => "STORAGE_FAILURE",
        }
    }
}

impl From<ExpiryError> for Error {
    fn from(err: ExpiryError) -> Self {
        match err {
            ExpiryError::InvalidFormat { .. } => Error::InvalidExpiry(err),
            ExpiryError::BelowMinimum { .. } | ExpiryError::AboveMaximum { .. } => Error::ExpiryOutOfRange(err),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Storage(err)
    }
}
