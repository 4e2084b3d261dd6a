//! # Synchronized Objects
//!
//! A [`SyncObject`] is one lockable engine entity: a player, a mixer, a device.
//! It owns its lock, its condition variable and its dirty mask. It does not own
//! its engine; it only keeps a weak reference for change notification.
//!
//! ```text
//! SyncObject
//! ├── kind            row in the handler table
//! ├── slot            bit in the engine's changed mask (optional)
//! ├── engine          Weak<Engine>
//! └── lock ─────────┐
//!                   ▼
//!        ObjectState { dirty, value: S }   (only reachable while locked)
//! ```

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use objsync_shared::{AttributeMask, ObjectKind};

use crate::engine::{Engine, InstanceSlot};
use crate::error::SyncResult;
use crate::handler::HandlerTable;
use crate::lock::{Checked, DefaultPolicy, LockGuard, LockPolicy, ObjectLock};

/// State protected by an object's lock.
pub(crate) struct ObjectState<S> {
    /// Attributes waiting for asynchronous processing.
    pub(crate) dirty: AttributeMask,
    /// Caller-defined object state.
    pub(crate) value: S,
}

/// A lockable engine object with attribute-change propagation.
pub struct SyncObject<S: 'static, P: LockPolicy = DefaultPolicy> {
    kind: ObjectKind,
    slot: Option<InstanceSlot>,
    engine: Weak<Engine>,
    handlers: &'static HandlerTable<S>,
    lock: ObjectLock<ObjectState<S>, P>,
}

impl<S: 'static, P: LockPolicy> SyncObject<S, P> {
    /// Creates an object that is not tracked by any engine.
    ///
    /// Deferred attributes still accumulate in its dirty mask, but nobody is
    /// notified about them.
    #[must_use]
    pub fn new(kind: ObjectKind, handlers: &'static HandlerTable<S>, value: S) -> Self {
        Self {
            kind,
            slot: None,
            engine: Weak::new(),
            handlers,
            lock: ObjectLock::new(ObjectState {
                dirty: AttributeMask::empty(),
                value,
            }),
        }
    }

    /// Creates an object tracked by `engine`, claiming an instance slot.
    ///
    /// The slot is released again when the object is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::EngineFull`] if every slot is taken.
    pub fn attach(
        engine: &Arc<Engine>,
        kind: ObjectKind,
        handlers: &'static HandlerTable<S>,
        value: S,
    ) -> SyncResult<Self> {
        let slot = engine.claim_slot()?;
        Ok(Self::bind(engine, slot, kind, handlers, value))
    }

    /// Creates an object tracked by `engine` in the given 1-based slot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::SlotOutOfRange`] for a slot beyond the
    /// engine's capacity and [`crate::SyncError::SlotTaken`] if another
    /// object owns it.
    pub fn attach_at(
        engine: &Arc<Engine>,
        index: u8,
        kind: ObjectKind,
        handlers: &'static HandlerTable<S>,
        value: S,
    ) -> SyncResult<Self> {
        let slot = engine.claim_slot_at(index)?;
        Ok(Self::bind(engine, slot, kind, handlers, value))
    }

    fn bind(
        engine: &Arc<Engine>,
        slot: InstanceSlot,
        kind: ObjectKind,
        handlers: &'static HandlerTable<S>,
        value: S,
    ) -> Self {
        let mut object = Self::new(kind, handlers, value);
        object.slot = Some(slot);
        object.engine = Arc::downgrade(engine);
        object
    }

    /// Kind of this object.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Instance slot, if the object is tracked.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> Option<InstanceSlot> {
        self.slot
    }

    /// Owning engine, if it is still alive.
    #[must_use]
    pub fn engine(&self) -> Option<Arc<Engine>> {
        self.engine.upgrade()
    }

    /// Handler table used by reporting unlocks.
    #[inline]
    #[must_use]
    pub fn handlers(&self) -> &'static HandlerTable<S> {
        self.handlers
    }

    /// Blocks until the calling thread holds this object's lock.
    ///
    /// # Panics
    ///
    /// Under the checked policy, panics on a recursive lock or on stale
    /// bookkeeping left by another call site.
    #[track_caller]
    pub fn lock_exclusive(&self) -> ObjectGuard<'_, S, P> {
        ObjectGuard {
            object: self,
            guard: self.lock.lock(),
        }
    }

    /// Wakes at most one thread waiting on this object.
    #[inline]
    pub fn signal(&self) -> bool {
        self.lock.signal()
    }

    /// Wakes every thread waiting on this object.
    #[inline]
    pub fn broadcast(&self) -> usize {
        self.lock.broadcast()
    }

    /// Takes and clears the dirty mask. Consumer side of the engine contract.
    #[track_caller]
    pub fn take_dirty(&self) -> AttributeMask {
        self.lock_exclusive().take_dirty()
    }

    /// Snapshot of the dirty mask.
    #[track_caller]
    pub fn dirty(&self) -> AttributeMask {
        self.lock_exclusive().dirty()
    }

    pub(crate) fn notify_engine(&self, slot: InstanceSlot) -> bool {
        match self.engine.upgrade() {
            Some(engine) => {
                engine.notify_changed(slot);
                true
            }
            None => {
                tracing::trace!(?slot, kind = ?self.kind, "engine gone, change notification dropped");
                false
            }
        }
    }
}

impl<S: 'static> SyncObject<S, Checked> {
    /// Returns true if the calling thread holds this object's lock.
    #[must_use]
    pub fn is_locked_by_current_thread(&self) -> bool {
        self.lock.is_held_by_current_thread()
    }
}

impl<S: 'static, P: LockPolicy> fmt::Debug for SyncObject<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncObject")
            .field("kind", &self.kind)
            .field("slot", &self.slot)
            .field("attached", &(self.engine.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl<S: 'static, P: LockPolicy> Drop for SyncObject<S, P> {
    fn drop(&mut self) {
        if let (Some(slot), Some(engine)) = (self.slot, self.engine.upgrade()) {
            engine.release_slot(slot);
        }
    }
}

/// Exclusive access to a [`SyncObject`].
///
/// Dropping the guard (or [`ObjectGuard::unlock`]) releases the lock without
/// reporting. [`ObjectGuard::unlock_with_report`] releases it and propagates
/// attribute changes.
pub struct ObjectGuard<'a, S: 'static, P: LockPolicy = DefaultPolicy> {
    pub(crate) object: &'a SyncObject<S, P>,
    pub(crate) guard: LockGuard<'a, ObjectState<S>, P>,
}

impl<'a, S: 'static, P: LockPolicy> ObjectGuard<'a, S, P> {
    /// The locked object.
    #[inline]
    #[must_use]
    pub fn object(&self) -> &'a SyncObject<S, P> {
        self.object
    }

    /// Releases the lock without reporting any attribute change.
    #[track_caller]
    pub fn unlock(self) {
        self.guard.unlock();
    }

    /// Attributes waiting for asynchronous processing.
    #[inline]
    #[must_use]
    pub fn dirty(&self) -> AttributeMask {
        self.guard.dirty
    }

    /// Takes and clears the dirty mask.
    #[inline]
    pub fn take_dirty(&mut self) -> AttributeMask {
        mem::take(&mut self.guard.dirty)
    }

    /// Releases the lock, sleeps until woken, and re-acquires it.
    #[track_caller]
    pub fn wait(&mut self) {
        self.guard.wait();
    }

    /// Waits until `condition` on the object state returns false.
    #[track_caller]
    pub fn wait_while<F>(&mut self, mut condition: F)
    where
        F: FnMut(&mut S) -> bool,
    {
        self.guard.wait_while(|state| condition(&mut state.value));
    }
}

impl<S: 'static, P: LockPolicy> Deref for ObjectGuard<'_, S, P> {
    type Target = S;

    #[inline]
    fn deref(&self) -> &S {
        &self.guard.value
    }
}

impl<S: 'static, P: LockPolicy> DerefMut for ObjectGuard<'_, S, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard.value
    }
}
