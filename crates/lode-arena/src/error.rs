//! Arena-specific error types.
//!
//! Only conditions a caller can act on are errors. Contract violations
//! (zero-sized requests, double free, foreign or stale handles, writes past
//! a block's end) are caller bugs and panic instead.

use std::error::Error;
use std::fmt;

use lode_core::StorageError;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The configuration failed validation.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// Growth would take the arena past its configured ceiling.
    CapacityExceeded {
        /// Total arena capacity that was needed, in bytes: the target passed
        /// to `grow`, or current capacity plus the allocation size when an
        /// allocation could not be satisfied.
        requested: usize,
        /// Configured maximum total capacity.
        limit: usize,
    },
    /// The storage collaborator failed.
    Storage(StorageError),
    /// A structural invariant does not hold. Returned by
    /// [`Arena::validate`](crate::Arena::validate).
    Corrupted {
        /// Which invariant failed, and where.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::CapacityExceeded { requested, limit } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, limit {limit} bytes"
                )
            }
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::Corrupted { reason } => write!(f, "arena corrupted: {reason}"),
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ArenaError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_is_source() {
        let err = ArenaError::from(StorageError::NotMapped);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "storage failure: storage is not mapped");
    }

    #[test]
    fn capacity_message_names_both_sizes() {
        let err = ArenaError::CapacityExceeded {
            requested: 2048,
            limit: 1024,
        };
        let text = err.to_string();
        assert!(text.contains("2048"));
        assert!(text.contains("1024"));
    }
}
