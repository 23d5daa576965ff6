//! Core types and traits for the Lode byte arena.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the allocator and its collaborators:
//! arena and block identifiers, storage error types, and the
//! [`MappedStorage`] trait through which the arena reaches its
//! physical backing store.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::StorageError;
pub use id::{ArenaId, BlockId};
pub use traits::{BufferTarget, MappedStorage};
