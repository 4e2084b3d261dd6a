//! Condition variable bound to an object lock.
//!
//! Wake-ups carry no information: a waiter may return because of a signal, a
//! broadcast meant for someone else, or spuriously. Always re-check the
//! predicate, or use [`LockGuard::wait_while`].

use std::panic::Location;

use super::{LockGuard, LockPolicy, ObjectLock, Site};

impl<T, P: LockPolicy> ObjectLock<T, P> {
    /// Wakes at most one waiter. Returns true if one was woken.
    ///
    /// Nothing is remembered if nobody is waiting.
    #[inline]
    pub fn signal(&self) -> bool {
        self.condition.notify_one()
    }

    /// Wakes every current waiter. Returns how many were woken.
    #[inline]
    pub fn broadcast(&self) -> usize {
        self.condition.notify_all()
    }
}

impl<T, P: LockPolicy> LockGuard<'_, T, P> {
    /// Releases the lock, sleeps until woken, and re-acquires the lock.
    ///
    /// No timeout and no cancellation: a caller wanting either wakes the
    /// waiter and re-checks its own deadline or stop flag.
    #[track_caller]
    pub fn wait(&mut self) {
        self.wait_at(Location::caller());
    }

    /// Waits until `condition` returns false.
    ///
    /// `condition` is evaluated with the lock held, before the first wait and
    /// after every wake-up.
    #[track_caller]
    pub fn wait_while<F>(&mut self, mut condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        let site = Location::caller();
        while condition(&mut *self.inner) {
            self.wait_at(site);
        }
    }

    fn wait_at(&mut self, site: Site) {
        P::suspend(&self.lock.record, site);
        self.lock.condition.wait(&mut self.inner);
        P::resume(&self.lock.record, site);
        self.site = site;
    }
}
