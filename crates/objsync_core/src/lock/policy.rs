//! # Lock Policies
//!
//! Two build profiles for object locks:
//!
//! - [`Unchecked`]: a plain blocking mutex. No bookkeeping at all.
//! - [`Checked`]: records which thread holds the lock and where it was taken,
//!   backs off on contention and reports it, and turns recursive locks and
//!   stale bookkeeping into immediate fatal errors.
//!
//! [`DefaultPolicy`] picks `Checked` in debug builds (or with the
//! `diagnostics` feature) and `Unchecked` otherwise.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use objsync_shared::CONTENTION_BACKOFF_MS;
use parking_lot::{Mutex, MutexGuard};

/// Source location of a lock transition.
pub type Site = &'static Location<'static>;

/// Strategy deciding how an object lock is acquired and released.
pub trait LockPolicy: Send + Sync + 'static {
    /// Per-lock bookkeeping stored next to the mutex.
    type Record: Default + Send + Sync;

    /// Blocks until `mutex` is held by the calling thread.
    fn acquire<'a, T>(mutex: &'a Mutex<T>, record: &Self::Record, site: Site) -> MutexGuard<'a, T>;

    /// Called right before the mutex is released.
    fn release(record: &Self::Record, site: Site);

    /// Called right before a condition wait gives up the mutex.
    fn suspend(record: &Self::Record, site: Site);

    /// Called right after a condition wait re-acquired the mutex.
    fn resume(record: &Self::Record, site: Site);
}

/// Production policy: single blocking acquire, no bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl LockPolicy for Unchecked {
    type Record = ();

    #[inline]
    fn acquire<'a, T>(mutex: &'a Mutex<T>, _record: &(), _site: Site) -> MutexGuard<'a, T> {
        mutex.lock()
    }

    #[inline]
    fn release(_record: &(), _site: Site) {}

    #[inline]
    fn suspend(_record: &(), _site: Site) {}

    #[inline]
    fn resume(_record: &(), _site: Site) {}
}

/// Diagnostic policy: owner/site bookkeeping and contention reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Checked;

/// Policy used when none is named.
#[cfg(any(debug_assertions, feature = "diagnostics"))]
pub type DefaultPolicy = Checked;

/// Policy used when none is named.
#[cfg(not(any(debug_assertions, feature = "diagnostics")))]
pub type DefaultPolicy = Unchecked;

/// Small process-unique tag of the calling thread. Never zero.
pub(crate) fn current_thread_tag() -> u64 {
    static NEXT_TAG: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static TAG: u64 = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
    }
    TAG.with(|tag| *tag)
}

/// Snapshot of who holds a checked lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Holder {
    /// Thread tag of the holder, zero when unlocked.
    pub owner: u64,
    /// Site of the most recent lock, unlock or wait transition.
    pub site: Option<Site>,
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.site {
            Some(site) => write!(f, "thread #{} at {site}", self.owner),
            None => write!(f, "thread #{} at <unknown>", self.owner),
        }
    }
}

/// Bookkeeping of a [`Checked`] lock.
///
/// Lives outside the object mutex so it can be read while the mutex is
/// contended. Its own mutex is a leaf lock held for a few instructions.
#[derive(Debug, Default)]
pub struct OwnerRecord {
    holder: Mutex<Holder>,
}

impl OwnerRecord {
    /// Current holder snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Holder {
        *self.holder.lock()
    }

    /// Records `owner` as the holder, asserting nobody is recorded yet.
    fn claim(&self, owner: u64, site: Site) {
        let mut holder = self.holder.lock();
        if holder.owner != 0 {
            let previous = *holder;
            drop(holder);
            if previous.owner == owner {
                fatal(site, "object lock was recursively locked", previous);
            }
            fatal(site, "object lock was left locked in unexpected state", previous);
        }
        *holder = Holder { owner, site: Some(site) };
    }

    /// Clears the holder, asserting `owner` is the one recorded.
    fn clear(&self, owner: u64, site: Site) {
        let mut holder = self.holder.lock();
        if holder.owner != owner && !thread::panicking() {
            let previous = *holder;
            drop(holder);
            fatal(site, "object lock released by a thread that does not own it", previous);
        }
        *holder = Holder { owner: 0, site: Some(site) };
    }
}

#[cold]
#[track_caller]
fn fatal(site: Site, what: &str, holder: Holder) -> ! {
    tracing::error!(%site, %holder, "{what}");
    panic!("{site}: {what} (held by {holder})");
}

impl Checked {
    #[cold]
    fn acquire_contended<'a, T>(
        mutex: &'a Mutex<T>,
        record: &OwnerRecord,
        site: Site,
        me: u64,
    ) -> MutexGuard<'a, T> {
        for delay_ms in CONTENTION_BACKOFF_MS {
            let holder = record.snapshot();
            if holder.owner == me {
                // Retrying would only deadlock against ourselves.
                fatal(site, "object lock was recursively locked", holder);
            }
            thread::sleep(Duration::from_millis(delay_ms));
            if let Some(guard) = mutex.try_lock() {
                return guard;
            }
        }

        let holder = record.snapshot();
        if holder.owner == me {
            fatal(site, "object lock was recursively locked", holder);
        }
        tracing::warn!(%site, %holder, "object lock still contended after backoff, blocking");
        mutex.lock()
    }
}

impl LockPolicy for Checked {
    type Record = OwnerRecord;

    fn acquire<'a, T>(mutex: &'a Mutex<T>, record: &OwnerRecord, site: Site) -> MutexGuard<'a, T> {
        let me = current_thread_tag();
        let guard = match mutex.try_lock() {
            Some(guard) => guard,
            None => Self::acquire_contended(mutex, record, site, me),
        };
        record.claim(me, site);
        guard
    }

    fn release(record: &OwnerRecord, site: Site) {
        record.clear(current_thread_tag(), site);
    }

    fn suspend(record: &OwnerRecord, site: Site) {
        // Whoever takes the mutex while we sleep is unknown to us.
        record.clear(current_thread_tag(), site);
    }

    fn resume(record: &OwnerRecord, site: Site) {
        record.claim(current_thread_tag(), site);
    }
}
