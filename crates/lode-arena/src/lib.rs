//! Growable, defragmenting best-fit byte arena.
//!
//! An [`Arena`] manages one logical byte buffer as a chain of blocks that
//! tile it exactly. Callers allocate blocks, fill them through a
//! [`BlockWriter`], and free them again; the arena keeps the physical copy
//! of the buffer in a [`MappedStorage`](lode_core::MappedStorage)
//! collaborator, typically a device vertex or index buffer.
//!
//! # Architecture
//!
//! ```text
//! Arena<S: MappedStorage>
//! ├── BlockChain   (slot table, address-ordered doubly linked list)
//! ├── FreeIndex    (free slots sorted by (capacity, address))
//! └── S + handle   (physical store, created on first activate)
//! ```
//!
//! Four operations change the layout:
//!
//! - **allocate:** best fit from the free index, splitting off the remainder.
//! - **free:** return a block and coalesce with free neighbours.
//! - **grow:** enlarge the buffer, replacing the physical store and copying
//!   live bytes across.
//! - **pack:** slide live blocks down so free space forms one trailing block.
//!
//! [`HostStorage`] is an in-memory collaborator for headless use.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
mod block;
pub mod config;
pub mod error;
mod free_index;
pub mod stats;
pub mod storage;
mod validate;
pub mod write;

pub use arena::Arena;
pub use block::BlockInfo;
pub use config::{ArenaConfig, GrowthPolicy};
pub use error::ArenaError;
pub use stats::ArenaStats;
pub use storage::{HostHandle, HostStorage};
pub use write::BlockWriter;
