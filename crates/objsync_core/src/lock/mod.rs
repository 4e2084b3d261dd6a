//! # Object Locks
//!
//! Every engine object is guarded by one mutex and one condition variable.
//!
//! ```text
//!   UNLOCKED ──lock()──> LOCKED(owner)
//!      ▲                     │
//!      └──unlock()/drop──────┤
//!                            │ wait()
//!                            ▼
//!   LOCKED(owner') <── UNLOCKED (suspended)
//! ```
//!
//! ## Rules
//!
//! 1. Never hold two object locks at the same time.
//! 2. Never hold an object lock while taking the engine lock.
//!
//! Because no thread ever waits for a second lock while holding a first one,
//! no lock-order cycle can form.

mod condvar;
mod policy;

use std::ops::{Deref, DerefMut};
use std::panic::Location;

use parking_lot::{Condvar, Mutex, MutexGuard};

pub use policy::{Checked, DefaultPolicy, Holder, LockPolicy, OwnerRecord, Site, Unchecked};

pub(crate) use policy::current_thread_tag;

/// Exclusive lock with an attached condition variable.
///
/// `P` selects the bookkeeping profile, see [`LockPolicy`].
pub struct ObjectLock<T, P: LockPolicy = DefaultPolicy> {
    mutex: Mutex<T>,
    condition: Condvar,
    record: P::Record,
}

impl<T, P: LockPolicy> ObjectLock<T, P> {
    /// Creates an unlocked lock around `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            mutex: Mutex::new(value),
            condition: Condvar::new(),
            record: P::Record::default(),
        }
    }

    /// Blocks until the calling thread holds the lock.
    ///
    /// # Panics
    ///
    /// Under [`Checked`], panics if the calling thread already holds the lock
    /// or if the previous holder left its bookkeeping behind.
    #[track_caller]
    pub fn lock(&self) -> LockGuard<'_, T, P> {
        let site = Location::caller();
        let inner = P::acquire(&self.mutex, &self.record, site);
        LockGuard { lock: self, inner, site }
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.mutex.into_inner()
    }
}

impl<T> ObjectLock<T, Checked> {
    /// Returns true if the calling thread is the recorded holder.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.record.snapshot().owner == current_thread_tag()
    }

    /// Site of the most recent lock, unlock or wait transition.
    #[must_use]
    pub fn last_site(&self) -> Option<Site> {
        self.record.snapshot().site
    }
}

impl<T: Default, P: LockPolicy> Default for ObjectLock<T, P> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard of an [`ObjectLock`].
///
/// Dropping the guard is a plain unlock: bookkeeping is cleared first, then
/// the mutex is released.
///
/// `Drop` has no caller location, so a drop-unlock records the site of the
/// last lock or wait made through this guard. Call [`LockGuard::unlock`] to
/// record the unlocking line instead.
pub struct LockGuard<'a, T, P: LockPolicy = DefaultPolicy> {
    lock: &'a ObjectLock<T, P>,
    inner: MutexGuard<'a, T>,
    site: Site,
}

impl<T, P: LockPolicy> LockGuard<'_, T, P> {
    /// Releases the lock without reporting anything.
    #[track_caller]
    pub fn unlock(mut self) {
        self.site = Location::caller();
    }
}

impl<T, P: LockPolicy> Deref for LockGuard<'_, T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T, P: LockPolicy> DerefMut for LockGuard<'_, T, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T, P: LockPolicy> Drop for LockGuard<'_, T, P> {
    fn drop(&mut self) {
        // `inner` is dropped after this body, so the mutex is still held here.
        P::release(&self.lock.record, self.site);
    }
}
