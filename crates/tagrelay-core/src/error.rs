//! # Error Types
//!
//! Domain-specific error types for tagrelay-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tagrelay-core errors (this file)                                      │
//! │  └── CoreError        - Invalid identifiers and malformed records      │
//! │                                                                         │
//! │  tagrelay-store errors (separate crate)                                │
//! │  └── StoreError       - Queue file operation failures                  │
//! │                                                                         │
//! │  tagrelay-sync errors (separate crate)                                 │
//! │  └── RelayError       - Connectivity, transport, rejection, storage    │
//! │                                                                         │
//! │  Flow: CoreError → (logged and skipped) ; StoreError → RelayError      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while building identifiers or parsing records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Tag identifier length is outside `1..=MAX_UID_LEN`.
    ///
    /// ## When This Occurs
    /// - The reader reported a zero-length identifier
    /// - A corrupted read produced more bytes than any tag carries
    #[error("Tag identifier must be 1 to {max} bytes, got {len}")]
    InvalidUidLength { len: usize, max: usize },

    /// A queued line is not a valid record.
    ///
    /// ## When This Occurs
    /// - A write was torn by power loss mid-line
    /// - The queue file was edited by hand
    #[error("Malformed record '{line}': {reason}")]
    MalformedRecord { line: String, reason: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidUidLength { len: 0, max: 10 };
        assert_eq!(err.to_string(), "Tag identifier must be 1 to 10 bytes, got 0");

        let err = CoreError::MalformedRecord {
            line: "ABC".to_string(),
            reason: "odd number of hex digits",
        };
        assert_eq!(err.to_string(), "Malformed record 'ABC': odd number of hex digits");
    }
}
