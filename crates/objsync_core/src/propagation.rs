//! # Attribute Propagation
//!
//! The reporting unlock: after a critical section changed some attributes,
//! resolve what can be resolved synchronously, park the rest in the object's
//! dirty mask, and tell the engine about the object at most once per pending
//! batch.
//!
//! ```text
//!   attributes ──> [handler per set bit] ──> deferred
//!                                              │
//!                 dirty was empty? ────────────┤
//!                                              ▼
//!   unlock object ──> lock engine ──> changed |= 1 << (slot - 1) ──> unlock
//! ```
//!
//! The object lock is always released before the engine lock is taken, so the
//! only lock order that ever exists is "one lock at a time".

use objsync_shared::{AttributeMask, ATTRIBUTE_COUNT};

use crate::lock::LockPolicy;
use crate::object::ObjectGuard;

/// What a reporting unlock did with the reported attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Attributes left for asynchronous processing.
    pub deferred: AttributeMask,
    /// Whether the owning engine was told about this object.
    pub notified: bool,
}

impl<S: 'static, P: LockPolicy> ObjectGuard<'_, S, P> {
    /// Releases the lock and reports that `attributes` changed.
    ///
    /// Every set bit is dispatched to its handler (if any) while the lock is
    /// still held; bits the handler does not resolve are merged into the dirty
    /// mask. If the dirty mask was empty before this call, the owning engine is
    /// notified after the object lock has been released.
    ///
    /// # Panics
    ///
    /// Panics if `attributes` carries a bit without a handler-table column.
    #[track_caller]
    pub fn unlock_with_report(mut self, attributes: AttributeMask) -> ReportOutcome {
        let object = self.object;
        let row = object.kind().dense_index();
        let handlers = object.handlers();

        let mut pending = attributes.bits();
        let mut deferred = attributes;
        while pending != 0 {
            // One bit-scan per set bit, independent of how many attributes exist.
            let bit = pending.trailing_zeros();
            assert!(
                (bit as usize) < ATTRIBUTE_COUNT,
                "attribute bit {bit} has no handler column"
            );
            let single = AttributeMask::from_bits_retain(1 << bit);
            if let Some(handler) = handlers.get(row, bit as usize) {
                let resolved = handler(&mut self.guard.value);
                deferred.remove(resolved & single);
            }
            pending &= !(1 << bit);
        }

        let mut owed = false;
        if !deferred.is_empty() {
            let had_pending = !self.guard.dirty.is_empty();
            self.guard.dirty.insert(deferred);
            // An earlier batch already notified (or will notify) the engine.
            owed = !had_pending;
        }

        self.guard.unlock();

        let notified = match object.slot() {
            Some(slot) if owed => object.notify_engine(slot),
            _ => false,
        };
        ReportOutcome { deferred, notified }
    }
}
