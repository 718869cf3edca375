//! # Relay Error Types
//!
//! Error types for delivery, sync and startup.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Relay Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Delivery     │  │     Storage             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connectivity   │  │  StorageFailure         │ │
//! │  │  InvalidUrl     │  │   Unavailable   │  │  (open/rename/delete)   │ │
//! │  │  ConfigLoad     │  │  Transport      │  │                         │ │
//! │  │  ConfigSave     │  │  RemoteRejection│  │                         │ │
//! │  │  ClientBuild    │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Hardware     │   FATAL: the only error that stops the loop.      │
//! │  │  ReaderNotFound │   Everything else degrades to "record kept,       │
//! │  └─────────────────┘   indicator shows error".                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use tagrelay_store::StoreError;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay error type covering every failure the device can hit.
#[derive(Debug, Error)]
pub enum RelayError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid relay configuration.
    #[error("Invalid relay configuration: {0}")]
    InvalidConfig(String),

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // =========================================================================
    // Delivery Errors
    // =========================================================================
    /// No network link; nothing was sent.
    #[error("Network connectivity unavailable")]
    ConnectivityUnavailable,

    /// The request never produced a response.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The endpoint answered with something other than 201 Created.
    #[error("Remote rejected record with status {0}")]
    RemoteRejection(u16),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Queue file open/append/rename/read/delete failed.
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StoreError),

    // =========================================================================
    // Hardware Errors
    // =========================================================================
    /// NFC transceiver did not answer at startup.
    #[error("NFC transceiver not found")]
    ReaderNotFound,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        RelayError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(err: toml::ser::Error) -> Self {
        RelayError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl RelayError {
    /// Returns true if the record involved is kept and retried on a later
    /// drain pass.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::ConnectivityUnavailable
                | RelayError::TransportFailure(_)
                | RelayError::RemoteRejection(_)
                | RelayError::StorageFailure(_)
        )
    }

    /// Returns true if the control loop must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::ReaderNotFound)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidConfig(_)
                | RelayError::InvalidUrl(_)
                | RelayError::ConfigLoadFailed(_)
                | RelayError::ConfigSaveFailed(_)
                | RelayError::ClientBuild(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_retryable_errors() {
        assert!(RelayError::ConnectivityUnavailable.is_retryable());
        assert!(RelayError::TransportFailure("refused".into()).is_retryable());
        assert!(RelayError::RemoteRejection(409).is_retryable());

        assert!(!RelayError::ReaderNotFound.is_retryable());
        assert!(!RelayError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_only_missing_reader_is_fatal() {
        assert!(RelayError::ReaderNotFound.is_fatal());
        assert!(!RelayError::ConnectivityUnavailable.is_fatal());
        assert!(!RelayError::RemoteRejection(500).is_fatal());
    }

    #[test]
    fn test_store_error_becomes_storage_failure() {
        let store_err = StoreError::Open {
            path: PathBuf::from("/sending.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let err: RelayError = store_err.into();
        assert!(matches!(err, RelayError::StorageFailure(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("/sending.txt"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RelayError::RemoteRejection(409).to_string(),
            "Remote rejected record with status 409"
        );
    }
}
