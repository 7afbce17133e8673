/*!
 * Error types for the polyharvest pipeline.
 *
 * Each subsystem has its own error enum, defined with thiserror. Only the
 * fatal classes (`CacheError::Corrupt`, an unreachable store at startup)
 * are expected to escape the collection controller; everything else is
 * converted into a statistic or a field-level sentinel close to where it
 * happens.
 */

use thiserror::Error;

/// Errors that can occur when calling a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or exhausted quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The backend answered but produced no usable text
    #[error("Empty response from backend: {0}")]
    EmptyResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by a content source connector
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network level failure talking to the source
    #[error("Source request failed: {0}")]
    RequestFailed(String),

    /// The source answered with a non-success status
    #[error("Source '{source_id}' responded with status {status_code}")]
    Status {
        /// Source that was being fetched
        source_id: String,
        /// HTTP status code
        status_code: u16,
    },

    /// The payload could not be decoded
    #[error("Failed to parse source payload: {0}")]
    ParseError(String),

    /// The source does not exist (removed, banned, private)
    #[error("Source not found: {0}")]
    NotFound(String),

    /// Local I/O failure (file based connectors)
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the translation cache and its storage backends
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O failure while reading or writing the cache artifact
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache artifact exists but cannot be decoded
    #[error("Cache file {path} is corrupt: {message}")]
    Corrupt {
        /// Location of the artifact
        path: String,
        /// Decoder message
        message: String,
    },

    /// Failure inside a store backend (serialization, database)
    #[error("Cache store error: {0}")]
    Store(String),
}

impl CacheError {
    /// Whether this error must abort the run before any item is processed
    pub fn is_fatal(&self) -> bool {
        matches!(self, CacheError::Corrupt { .. })
    }
}

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// A uniqueness or foreign key constraint rejected the record
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// A reply references a parent that cannot be addressed
    #[error("Reply {reply_id} has no addressable parent {parent_id}")]
    OrphanReply {
        /// Natural key of the reply
        reply_id: String,
        /// Natural key of the missing parent
        parent_id: String,
    },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl PersistenceError {
    /// Whether the failure is isolated to a single record
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            PersistenceError::Integrity(_) | PersistenceError::OrphanReply { .. }
        )
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Integrity(error.to_string())
            }
            _ => Self::Database(error.to_string()),
        }
    }
}

// The connection wrapper speaks anyhow; recover the typed error when possible
impl From<anyhow::Error> for PersistenceError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<PersistenceError>() {
            Ok(persistence) => persistence,
            Err(error) => match error.downcast::<rusqlite::Error>() {
                Ok(sqlite) => sqlite.into(),
                Err(other) => Self::Database(format!("{:#}", other)),
            },
        }
    }
}
