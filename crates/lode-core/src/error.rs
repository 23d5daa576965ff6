//! Error types reported by mapped-storage collaborators.

use std::error::Error;
use std::fmt;

/// Errors from a [`MappedStorage`](crate::MappedStorage) implementation.
///
/// The arena never retries these. They surface to the caller wrapped in the
/// arena's own error type, and the caller decides whether the process can
/// continue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// The device could not provide a store of the requested size.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// The handle does not name a live store.
    UnknownHandle,
    /// The operation requires the store to be active.
    NotActive,
    /// The store is already active.
    AlreadyActive,
    /// The store is already mapped.
    AlreadyMapped,
    /// The operation requires the store to be mapped.
    NotMapped,
    /// Any other device-level failure.
    Device {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "storage out of memory: requested {requested} bytes")
            }
            Self::UnknownHandle => write!(f, "unknown storage handle"),
            Self::NotActive => write!(f, "storage is not active"),
            Self::AlreadyActive => write!(f, "storage is already active"),
            Self::AlreadyMapped => write!(f, "storage is already mapped"),
            Self::NotMapped => write!(f, "storage is not mapped"),
            Self::Device { reason } => write!(f, "device error: {reason}"),
        }
    }
}

impl Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_size() {
        let err = StorageError::OutOfMemory { requested: 4096 };
        assert_eq!(err.to_string(), "storage out of memory: requested 4096 bytes");
    }

    #[test]
    fn device_reason_is_forwarded() {
        let err = StorageError::Device {
            reason: "lost context".into(),
        };
        assert!(err.to_string().contains("lost context"));
    }
}
