//! Host-memory implementation of [`MappedStorage`].
//!
//! [`HostStorage`] keeps every store in a zero-initialised `Vec<u8>` and
//! enforces the same state machine a device buffer would: a store must be
//! active before it can be mapped, and its bytes are only reachable while
//! mapped. It backs headless use of the arena and its tests.

use indexmap::IndexMap;
use lode_core::{BufferTarget, MappedStorage, StorageError};

/// Handle to one [`HostStorage`] store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostHandle(u32);

struct HostStore {
    target: BufferTarget,
    bytes: Vec<u8>,
    active: bool,
    mapped: bool,
}

/// Stores kept in host memory.
#[derive(Default)]
pub struct HostStorage {
    stores: IndexMap<HostHandle, HostStore>,
    next_handle: u32,
    /// Ceiling on the summed size of live stores, if any.
    limit: Option<usize>,
}

impl HostStorage {
    /// Unlimited host storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Host storage that refuses to hold more than `limit` bytes in total.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Number of live stores.
    pub fn live_stores(&self) -> usize {
        self.stores.len()
    }

    /// Summed size of live stores in bytes.
    pub fn live_bytes(&self) -> usize {
        self.stores.values().map(|s| s.bytes.len()).sum()
    }

    /// Size of a store in bytes.
    pub fn size_of(&self, handle: HostHandle) -> Option<usize> {
        self.stores.get(&handle).map(|s| s.bytes.len())
    }

    /// Binding point the store was created for.
    pub fn target_of(&self, handle: HostHandle) -> Option<BufferTarget> {
        self.stores.get(&handle).map(|s| s.target)
    }

    fn store_mut(&mut self, handle: HostHandle) -> Result<&mut HostStore, StorageError> {
        self.stores
            .get_mut(&handle)
            .ok_or(StorageError::UnknownHandle)
    }
}

impl MappedStorage for HostStorage {
    type Handle = HostHandle;

    fn create(&mut self, target: BufferTarget, size: usize) -> Result<HostHandle, StorageError> {
        if let Some(limit) = self.limit {
            if self.live_bytes().saturating_add(size) > limit {
                return Err(StorageError::OutOfMemory { requested: size });
            }
        }
        let handle = HostHandle(self.next_handle);
        self.next_handle += 1;
        self.stores.insert(
            handle,
            HostStore {
                target,
                bytes: vec![0; size],
                active: false,
                mapped: false,
            },
        );
        Ok(handle)
    }

    fn destroy(&mut self, handle: HostHandle) {
        let removed = self.stores.shift_remove(&handle);
        debug_assert!(
            removed.as_ref().is_none_or(|s| !s.active && !s.mapped),
            "destroying a store that is still active or mapped"
        );
    }

    fn activate(&mut self, handle: HostHandle) -> Result<(), StorageError> {
        let store = self.store_mut(handle)?;
        if store.active {
            return Err(StorageError::AlreadyActive);
        }
        store.active = true;
        Ok(())
    }

    fn deactivate(&mut self, handle: HostHandle) {
        if let Some(store) = self.stores.get_mut(&handle) {
            store.active = false;
        }
    }

    fn map(&mut self, handle: HostHandle) -> Result<(), StorageError> {
        let store = self.store_mut(handle)?;
        if !store.active {
            return Err(StorageError::NotActive);
        }
        if store.mapped {
            return Err(StorageError::AlreadyMapped);
        }
        store.mapped = true;
        Ok(())
    }

    fn unmap(&mut self, handle: HostHandle) {
        if let Some(store) = self.stores.get_mut(&handle) {
            store.mapped = false;
        }
    }

    fn mapped(&self, handle: HostHandle) -> Option<&[u8]> {
        self.stores
            .get(&handle)
            .filter(|s| s.mapped)
            .map(|s| s.bytes.as_slice())
    }

    fn mapped_mut(&mut self, handle: HostHandle) -> Option<&mut [u8]> {
        self.stores
            .get_mut(&handle)
            .filter(|s| s.mapped)
            .map(|s| s.bytes.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_zeroed_and_unmapped() {
        let mut storage = HostStorage::new();
        let h = storage.create(BufferTarget::Vertex, 64).unwrap();
        assert_eq!(storage.size_of(h), Some(64));
        assert_eq!(storage.target_of(h), Some(BufferTarget::Vertex));
        assert!(storage.mapped(h).is_none());

        storage.activate(h).unwrap();
        storage.map(h).unwrap();
        assert!(storage.mapped(h).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn map_requires_active() {
        let mut storage = HostStorage::new();
        let h = storage.create(BufferTarget::Index, 16).unwrap();
        assert_eq!(storage.map(h), Err(StorageError::NotActive));
        storage.activate(h).unwrap();
        assert_eq!(storage.activate(h), Err(StorageError::AlreadyActive));
        storage.map(h).unwrap();
        assert_eq!(storage.map(h), Err(StorageError::AlreadyMapped));
    }

    #[test]
    fn bytes_survive_unmap_and_remap() {
        let mut storage = HostStorage::new();
        let h = storage.create(BufferTarget::Vertex, 8).unwrap();
        storage.activate(h).unwrap();
        storage.map(h).unwrap();
        storage.mapped_mut(h).unwrap()[3] = 0xAB;
        storage.unmap(h);
        assert!(storage.mapped_mut(h).is_none());
        storage.map(h).unwrap();
        assert_eq!(storage.mapped(h).unwrap()[3], 0xAB);
    }

    #[test]
    fn limit_rejects_oversized_create() {
        let mut storage = HostStorage::with_limit(100);
        let h = storage.create(BufferTarget::Vertex, 60).unwrap();
        assert_eq!(
            storage.create(BufferTarget::Vertex, 60),
            Err(StorageError::OutOfMemory { requested: 60 })
        );
        storage.destroy(h);
        assert_eq!(storage.live_stores(), 0);
        assert!(storage.create(BufferTarget::Vertex, 100).is_ok());
    }

    #[test]
    fn unknown_handle_reported() {
        let mut storage = HostStorage::new();
        let h = storage.create(BufferTarget::Vertex, 4).unwrap();
        storage.destroy(h);
        assert_eq!(storage.activate(h), Err(StorageError::UnknownHandle));
    }
}
