//! # Engine Changed-Mask
//!
//! The engine is the root object every other object reports to. It owns one
//! bit per tracked instance; a set bit means "this instance has deferred
//! attributes waiting".
//!
//! ```text
//!   object A ──┐                                     ┌──> take_changed()
//!   object B ──┼──> [engine lock] changed |= bit ────┤
//!   object N ──┘         │                           └──> drain dirty masks
//!                        └── empty -> nonempty? ring the doorbell
//! ```
//!
//! The engine is a [`SyncObject`] in its own right: it can be locked, waited
//! on and signaled, and its own attributes dispatch through a handler table.
//! Its lock is independent of every object lock and is only ever taken on its
//! own. OR-ing bits is commutative and idempotent, so concurrent reports
//! from different objects lose nothing.

use std::fmt;
use std::mem;
use std::num::NonZeroU8;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use objsync_shared::{AttributeMask, AudioObjectKind, ObjectKind, MAX_INSTANCES};

use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::handler::HandlerTable;
use crate::object::{ObjectGuard, SyncObject};

/// 1-based position of an object in its engine's changed mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceSlot(NonZeroU8);

impl InstanceSlot {
    /// Slot `index`, if it is within `1..=MAX_INSTANCES`.
    #[must_use]
    pub fn new(index: u8) -> Option<Self> {
        if index > MAX_INSTANCES {
            return None;
        }
        NonZeroU8::new(index).map(Self)
    }

    /// 1-based slot number.
    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0.get()
    }

    /// Bit of this slot in a changed mask.
    #[inline]
    #[must_use]
    pub fn bit(self) -> u32 {
        1 << (self.get() - 1)
    }
}

/// Set of instance slots with pending deferred work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChangedMask(u32);

impl ChangedMask {
    /// Raw bits; bit `n` belongs to slot `n + 1`.
    #[inline]
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if no slot is set.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if `slot` is set.
    #[inline]
    #[must_use]
    pub fn contains(self, slot: InstanceSlot) -> bool {
        self.0 & slot.bit() != 0
    }

    /// Sets `slot`.
    #[inline]
    pub fn insert(&mut self, slot: InstanceSlot) {
        self.0 |= slot.bit();
    }

    /// Clears `slot`.
    #[inline]
    pub fn remove(&mut self, slot: InstanceSlot) {
        self.0 &= !slot.bit();
    }

    /// Number of set slots.
    #[inline]
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Set slots, lowest first.
    pub fn slots(self) -> impl Iterator<Item = InstanceSlot> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let bit = remaining.trailing_zeros();
            remaining &= !(1 << bit);
            // bit < 32 <= MAX_INSTANCES, so the slot is always valid.
            NonZeroU8::new(bit as u8 + 1).map(InstanceSlot)
        })
    }
}

/// State guarded by the engine's own lock.
#[derive(Debug, Default)]
pub struct EngineState {
    changed: ChangedMask,
    claimed: ChangedMask,
}

impl EngineState {
    /// Instances with deferred work not yet taken by a consumer.
    #[inline]
    #[must_use]
    pub fn changed(&self) -> ChangedMask {
        self.changed
    }

    /// Instance slots owned by live objects.
    #[inline]
    #[must_use]
    pub fn claimed(&self) -> ChangedMask {
        self.claimed
    }
}

static NO_ENGINE_HANDLERS: HandlerTable<EngineState> = HandlerTable::new();

/// Root object of an engine: owner of the changed mask.
///
/// The engine is itself a lockable object. It has a kind from either family,
/// a handler table for its own attributes, and a condition variable. It has no
/// instance slot and reports to nobody.
pub struct Engine {
    core: SyncObject<EngineState>,
    capacity: u8,
    doorbell: Sender<()>,
    bell: Receiver<()>,
}

impl Engine {
    /// Creates an audio-family engine with `config.max_instances` slots and no
    /// attribute handlers of its own.
    ///
    /// The slot count is clamped to `1..=MAX_INSTANCES`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Arc<Self> {
        Self::build(config, ObjectKind::Audio(AudioObjectKind::Engine), &NO_ENGINE_HANDLERS)
    }

    /// Creates an engine of `kind` whose own attributes dispatch through
    /// `handlers`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotAnEngine`] if `kind` is not the engine kind of
    /// either family.
    pub fn with_handlers(
        config: &EngineConfig,
        kind: ObjectKind,
        handlers: &'static HandlerTable<EngineState>,
    ) -> SyncResult<Arc<Self>> {
        if !kind.is_engine() {
            return Err(SyncError::NotAnEngine { kind: kind.raw() });
        }
        Ok(Self::build(config, kind, handlers))
    }

    fn build(config: &EngineConfig, kind: ObjectKind, handlers: &'static HandlerTable<EngineState>) -> Arc<Self> {
        // One pending ring is enough: the consumer always takes the whole mask.
        let (doorbell, bell) = crossbeam_channel::bounded(1);
        Arc::new(Self {
            core: SyncObject::new(kind, handlers, EngineState::default()),
            capacity: config.max_instances.clamp(1, MAX_INSTANCES),
            doorbell,
            bell,
        })
    }

    /// Kind of the engine object.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.core.kind()
    }

    /// Number of instance slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Blocks until the calling thread holds the engine lock.
    ///
    /// While it is held, no object may report to this engine from the same
    /// thread; [`Engine::notify_changed`] would relock it.
    #[track_caller]
    pub fn lock_exclusive(&self) -> ObjectGuard<'_, EngineState> {
        self.core.lock_exclusive()
    }

    /// Wakes at most one thread waiting on the engine.
    #[inline]
    pub fn signal(&self) -> bool {
        self.core.signal()
    }

    /// Wakes every thread waiting on the engine.
    #[inline]
    pub fn broadcast(&self) -> usize {
        self.core.broadcast()
    }

    /// Takes and clears the engine's own dirty attributes.
    #[track_caller]
    pub fn take_dirty(&self) -> AttributeMask {
        self.core.take_dirty()
    }

    /// Claims the lowest free instance slot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::EngineFull`] if every slot is claimed.
    #[track_caller]
    pub fn claim_slot(&self) -> SyncResult<InstanceSlot> {
        let mut state = self.core.lock_exclusive();
        let free = !state.claimed.bits() & self.slot_bits();
        let Some(slot) = InstanceSlot::new(free.trailing_zeros() as u8 + 1).filter(|_| free != 0) else {
            state.unlock();
            return Err(SyncError::EngineFull { capacity: self.capacity });
        };
        state.claimed.insert(slot);
        state.unlock();
        tracing::debug!(slot = slot.get(), "instance slot claimed");
        Ok(slot)
    }

    /// Claims a specific slot.
    ///
    /// Used by [`SyncObject::attach_at`]; a slot claimed here directly stays
    /// claimed until [`Engine::release_slot`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SlotOutOfRange`] for a slot beyond the capacity
    /// and [`SyncError::SlotTaken`] if it is already claimed.
    #[track_caller]
    pub fn claim_slot_at(&self, index: u8) -> SyncResult<InstanceSlot> {
        let slot = InstanceSlot::new(index)
            .filter(|slot| slot.get() <= self.capacity)
            .ok_or(SyncError::SlotOutOfRange {
                slot: index,
                capacity: self.capacity,
            })?;
        let mut state = self.core.lock_exclusive();
        let taken = state.claimed.contains(slot);
        if !taken {
            state.claimed.insert(slot);
        }
        state.unlock();
        if taken {
            return Err(SyncError::SlotTaken { slot: index });
        }
        tracing::debug!(slot = index, "instance slot claimed");
        Ok(slot)
    }

    /// Frees `slot` and drops any change pending for it.
    #[track_caller]
    pub fn release_slot(&self, slot: InstanceSlot) {
        let mut state = self.core.lock_exclusive();
        state.claimed.remove(slot);
        state.changed.remove(slot);
        state.unlock();
        tracing::debug!(slot = slot.get(), "instance slot released");
    }

    /// Number of claimed slots.
    #[must_use]
    #[track_caller]
    pub fn claimed_count(&self) -> usize {
        let state = self.core.lock_exclusive();
        let claimed = state.claimed.len();
        state.unlock();
        claimed
    }

    /// Marks `slot` as having deferred work.
    ///
    /// Must be called without holding any object lock. Rings the doorbell
    /// when the mask goes from empty to non-empty.
    #[track_caller]
    pub fn notify_changed(&self, slot: InstanceSlot) {
        debug_assert!(slot.get() <= self.capacity, "slot {} beyond engine capacity", slot.get());
        let mut state = self.core.lock_exclusive();
        let was_idle = state.changed.is_empty();
        state.changed.insert(slot);
        state.unlock();

        tracing::trace!(slot = slot.get(), was_idle, "instance changed");
        if was_idle {
            // A full channel means a wake-up is already pending.
            let _ = self.doorbell.try_send(());
        }
    }

    /// Snapshot of the changed mask.
    #[must_use]
    #[track_caller]
    pub fn changed_mask(&self) -> ChangedMask {
        let state = self.core.lock_exclusive();
        let changed = state.changed;
        state.unlock();
        changed
    }

    /// Reads and clears the changed mask.
    ///
    /// The caller must then drain each returned slot's dirty mask under that
    /// object's own lock; a slot may turn out clean if another consumer got
    /// there first.
    #[track_caller]
    pub fn take_changed(&self) -> ChangedMask {
        let mut state = self.core.lock_exclusive();
        let changed = mem::take(&mut state.changed);
        state.unlock();
        changed
    }

    /// Receiver that yields once per empty-to-non-empty transition.
    #[must_use]
    pub fn doorbell(&self) -> Receiver<()> {
        self.bell.clone()
    }

    fn slot_bits(&self) -> u32 {
        if self.capacity >= 32 {
            u32::MAX
        } else {
            (1 << self.capacity) - 1
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.lock_exclusive();
        let result = f
            .debug_struct("Engine")
            .field("kind", &self.core.kind())
            .field("capacity", &self.capacity)
            .field("claimed", &state.claimed)
            .field("changed", &state.changed)
            .finish();
        state.unlock();
        result
    }
}
