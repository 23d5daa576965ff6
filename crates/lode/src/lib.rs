//! Lode: a growable, defragmenting best-fit byte arena.
//!
//! Lode carves one large device buffer into variable-sized blocks, so many
//! small pieces of geometry can share a single vertex or index buffer. It
//! allocates best fit, coalesces on free, grows on demand while preserving
//! contents, and compacts live data on request.
//!
//! This is the facade crate that re-exports the public API of the Lode
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use lode::prelude::*;
//!
//! let config = ArenaConfig::new(1024);
//! let mut arena = Arena::new(config, HostStorage::new()).unwrap();
//! arena.activate().unwrap();
//! arena.map().unwrap();
//!
//! let quad = arena.allocate(4 * 12).unwrap();
//! let mut w = arena.writer(quad);
//! let mut at = 0;
//! for corner in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
//!     at = w.write_vec3(at, corner);
//! }
//!
//! let scratch = arena.allocate(256).unwrap();
//! arena.free(scratch);
//! arena.pack();
//!
//! let info = arena.block(quad);
//! assert_eq!((info.address, info.capacity), (0, 48));
//! assert_eq!(arena.free_capacity(), 1024 - 48);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `lode-arena` | `Arena`, configuration, host storage, block writer |
//! | [`types`] | `lode-core` | IDs, storage errors, the `MappedStorage` trait |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// The arena itself and its supporting types (`lode-arena`).
///
/// [`arena::Arena`] is generic over its storage collaborator;
/// [`arena::HostStorage`] keeps the bytes in host memory.
pub use lode_arena as arena;

/// Identifiers, storage errors, and the storage trait (`lode-core`).
///
/// Implement [`types::MappedStorage`] to back an arena with a real device
/// buffer.
pub use lode_core as types;

/// Common imports for typical Lode usage.
///
/// ```rust
/// use lode::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use lode_arena::{
        Arena, ArenaConfig, ArenaStats, BlockInfo, BlockWriter, GrowthPolicy, HostStorage,
    };

    // Core types and traits
    pub use lode_core::{ArenaId, BlockId, BufferTarget, MappedStorage};

    // Errors
    pub use lode_arena::ArenaError;
    pub use lode_core::StorageError;
}
