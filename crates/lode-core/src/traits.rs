//! The contract between an arena and its physical backing store.

use std::fmt;

use crate::error::StorageError;

/// What kind of device buffer a store backs.
///
/// The arena never interprets this; it is forwarded to
/// [`MappedStorage::create`] so the collaborator can pick the right binding
/// point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    #[default]
    Vertex,
    /// Element indices.
    Index,
}

impl fmt::Display for BufferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// Physical byte storage that an arena manages logically.
///
/// A store moves through two orthogonal states. *Active* means it is the
/// current target for device operations (bind/unbind). *Mapped* means its
/// bytes are visible to the host through [`mapped`](Self::mapped) and
/// [`mapped_mut`](Self::mapped_mut). Mapping requires the store to be
/// active.
///
/// The arena only ever holds one store at a time. Growing the arena destroys
/// the old store and creates a larger one, copying live bytes across.
pub trait MappedStorage {
    /// Opaque identifier for one store.
    type Handle: Copy + Eq + fmt::Debug;

    /// Allocate a store of exactly `size` bytes.
    fn create(&mut self, target: BufferTarget, size: usize) -> Result<Self::Handle, StorageError>;

    /// Release a store. It must be neither active nor mapped.
    fn destroy(&mut self, handle: Self::Handle);

    /// Make the store the active target for device operations.
    fn activate(&mut self, handle: Self::Handle) -> Result<(), StorageError>;

    /// Clear the active binding.
    fn deactivate(&mut self, handle: Self::Handle);

    /// Expose the store's bytes to the host.
    fn map(&mut self, handle: Self::Handle) -> Result<(), StorageError>;

    /// Revoke host access. Bytes written while mapped are kept.
    fn unmap(&mut self, handle: Self::Handle);

    /// Host view of a mapped store, or `None` when it is not mapped.
    fn mapped(&self, handle: Self::Handle) -> Option<&[u8]>;

    /// Writable host view of a mapped store, or `None` when it is not mapped.
    fn mapped_mut(&mut self, handle: Self::Handle) -> Option<&mut [u8]>;
}
