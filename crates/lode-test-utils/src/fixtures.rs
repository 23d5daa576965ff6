//! Storage doubles for arena tests.
//!
//! - [`RecordingStorage`] forwards to an inner store and logs every call.
//! - [`FailingStorage`] forwards to an inner store but fails `create` or
//!   `map` after a fixed number of successes.

use std::fmt;
use std::sync::{Arc, Mutex};

use lode_core::{BufferTarget, MappedStorage, StorageError};

/// One call an arena made on its storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageCall<H> {
    Create {
        target: BufferTarget,
        size: usize,
        handle: H,
    },
    Destroy(H),
    Activate(H),
    Deactivate(H),
    Map(H),
    Unmap(H),
}

/// Shared, cloneable view of a [`RecordingStorage`]'s call log.
///
/// Clone it before handing the storage to an arena; the clone keeps
/// observing after the arena (and its storage) is dropped.
pub struct CallLog<H> {
    calls: Arc<Mutex<Vec<StorageCall<H>>>>,
}

impl<H> Clone for CallLog<H> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<H: Clone> CallLog<H> {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, call: StorageCall<H>) {
        self.calls.lock().unwrap().push(call);
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<StorageCall<H>> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of successful `create` calls.
    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, StorageCall::Create { .. }))
    }

    /// Number of `destroy` calls.
    pub fn destroys(&self) -> usize {
        self.count(|c| matches!(c, StorageCall::Destroy(_)))
    }

    /// Sizes passed to successful `create` calls, in order.
    pub fn created_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                StorageCall::Create { size, .. } => Some(*size),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn count(&self, pred: impl Fn(&StorageCall<H>) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

impl<H: fmt::Debug> fmt::Debug for CallLog<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog")
            .field("calls", &self.calls.lock().unwrap())
            .finish()
    }
}

/// Forwards to `S` and records every call in a [`CallLog`].
///
/// Only calls that reach the inner store are logged; a failed `create`
/// leaves no entry.
pub struct RecordingStorage<S: MappedStorage> {
    inner: S,
    log: CallLog<S::Handle>,
}

impl<S: MappedStorage> RecordingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: CallLog::new(),
        }
    }

    /// Handle on the call log that outlives this storage.
    pub fn log(&self) -> CallLog<S::Handle> {
        self.log.clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: MappedStorage> MappedStorage for RecordingStorage<S> {
    type Handle = S::Handle;

    fn create(&mut self, target: BufferTarget, size: usize) -> Result<S::Handle, StorageError> {
        let handle = self.inner.create(target, size)?;
        self.log.push(StorageCall::Create {
            target,
            size,
            handle,
        });
        Ok(handle)
    }

    fn destroy(&mut self, handle: S::Handle) {
        self.log.push(StorageCall::Destroy(handle));
        self.inner.destroy(handle);
    }

    fn activate(&mut self, handle: S::Handle) -> Result<(), StorageError> {
        self.inner.activate(handle)?;
        self.log.push(StorageCall::Activate(handle));
        Ok(())
    }

    fn deactivate(&mut self, handle: S::Handle) {
        self.log.push(StorageCall::Deactivate(handle));
        self.inner.deactivate(handle);
    }

    fn map(&mut self, handle: S::Handle) -> Result<(), StorageError> {
        self.inner.map(handle)?;
        self.log.push(StorageCall::Map(handle));
        Ok(())
    }

    fn unmap(&mut self, handle: S::Handle) {
        self.log.push(StorageCall::Unmap(handle));
        self.inner.unmap(handle);
    }

    fn mapped(&self, handle: S::Handle) -> Option<&[u8]> {
        self.inner.mapped(handle)
    }

    fn mapped_mut(&mut self, handle: S::Handle) -> Option<&mut [u8]> {
        self.inner.mapped_mut(handle)
    }
}

/// Forwards to `S` but fails `create` or `map` once a quota of successful
/// calls has gone through.
///
/// Useful for exercising the error paths of arena growth deterministically.
pub struct FailingStorage<S> {
    inner: S,
    create_quota: usize,
    map_quota: usize,
    created: usize,
    mapped: usize,
}

impl<S: MappedStorage> FailingStorage<S> {
    /// Allow `successes` creates, then fail every one after that.
    pub fn fail_create_after(inner: S, successes: usize) -> Self {
        Self {
            inner,
            create_quota: successes,
            map_quota: usize::MAX,
            created: 0,
            mapped: 0,
        }
    }

    /// Allow `successes` maps, then fail every one after that.
    pub fn fail_map_after(inner: S, successes: usize) -> Self {
        Self {
            inner,
            create_quota: usize::MAX,
            map_quota: successes,
            created: 0,
            mapped: 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: MappedStorage> MappedStorage for FailingStorage<S> {
    type Handle = S::Handle;

    fn create(&mut self, target: BufferTarget, size: usize) -> Result<S::Handle, StorageError> {
        if self.created >= self.create_quota {
            return Err(StorageError::Device {
                reason: format!("create #{} of {size} bytes refused", self.created + 1),
            });
        }
        let handle = self.inner.create(target, size)?;
        self.created += 1;
        Ok(handle)
    }

    fn destroy(&mut self, handle: S::Handle) {
        self.inner.destroy(handle);
    }

    fn activate(&mut self, handle: S::Handle) -> Result<(), StorageError> {
        self.inner.activate(handle)
    }

    fn deactivate(&mut self, handle: S::Handle) {
        self.inner.deactivate(handle);
    }

    fn map(&mut self, handle: S::Handle) -> Result<(), StorageError> {
        if self.mapped >= self.map_quota {
            return Err(StorageError::Device {
                reason: format!("map #{} refused", self.mapped + 1),
            });
        }
        self.inner.map(handle)?;
        self.mapped += 1;
        Ok(())
    }

    fn unmap(&mut self, handle: S::Handle) {
        self.inner.unmap(handle);
    }

    fn mapped(&self, handle: S::Handle) -> Option<&[u8]> {
        self.inner.mapped(handle)
    }

    fn mapped_mut(&mut self, handle: S::Handle) -> Option<&mut [u8]> {
        self.inner.mapped_mut(handle)
    }
}
