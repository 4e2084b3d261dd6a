//! # Sync Worker
//!
//! Background consumer for an engine's changed mask.
//!
//! ```text
//!   doorbell ───┐
//!   shutdown ───┼──> select! ──> take_changed() ──> drain(slot) per set bit
//!   idle poll ──┘
//! ```
//!
//! The worker never touches object locks itself: the drain callback maps the
//! slot to its object and usually calls [`crate::SyncObject::take_dirty`].
//! Each object lock is taken alone, after the engine lock has been released.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::ConsumerConfig;
use crate::engine::{Engine, InstanceSlot};
use crate::error::{SyncError, SyncResult};

/// Counters kept by a [`SyncWorker`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Wake-ups caused by the doorbell.
    pub doorbells: u64,
    /// Wake-ups caused by the idle poll timeout.
    pub idle_polls: u64,
    /// Non-empty changed masks taken.
    pub batches: u64,
    /// Slots handed to the drain callback.
    pub slots_drained: u64,
}

/// Consumer thread draining an engine's changed mask.
///
/// Dropping the worker stops it; [`SyncWorker::shutdown`] does the same and
/// returns the final counters.
pub struct SyncWorker {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl SyncWorker {
    /// Starts a consumer for `engine`.
    ///
    /// `drain` is called on the worker thread once per changed slot, lowest
    /// slot first, with no lock held.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for an invalid `config` and
    /// [`SyncError::WorkerSpawn`] if the thread cannot be created.
    pub fn spawn<F>(engine: &Arc<Engine>, config: &ConsumerConfig, drain: F) -> SyncResult<Self>
    where
        F: FnMut(InstanceSlot) + Send + 'static,
    {
        config.validate()?;

        let (shutdown, stop) = crossbeam_channel::bounded(0);
        let stats = Arc::new(Mutex::new(WorkerStats::default()));

        let worker_engine = Arc::clone(engine);
        let worker_stats = Arc::clone(&stats);
        let worker_config = config.clone();

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || Self::run(&worker_engine, &stop, &worker_stats, &worker_config, drain))
            .map_err(|e| SyncError::WorkerSpawn(e.to_string()))?;

        tracing::debug!(thread = %config.thread_name, "sync worker started");
        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
            stats,
        })
    }

    /// Worker thread main loop.
    fn run<F>(
        engine: &Engine,
        stop: &Receiver<()>,
        stats: &Mutex<WorkerStats>,
        config: &ConsumerConfig,
        mut drain: F,
    ) where
        F: FnMut(InstanceSlot),
    {
        let bell = engine.doorbell();
        let idle = config.idle_poll();

        loop {
            select! {
                recv(bell) -> _ => {
                    stats.lock().doorbells += 1;
                }
                // A message or a dropped sender both mean stop.
                recv(stop) -> _ => break,
                default(idle) => {
                    stats.lock().idle_polls += 1;
                }
            }
            Self::drain_once(engine, stats, &mut drain);
        }

        // Anything reported before shutdown still gets drained.
        Self::drain_once(engine, stats, &mut drain);
        tracing::debug!(stats = ?*stats.lock(), "sync worker stopped");
    }

    fn drain_once<F>(engine: &Engine, stats: &Mutex<WorkerStats>, drain: &mut F)
    where
        F: FnMut(InstanceSlot),
    {
        let changed = engine.take_changed();
        if changed.is_empty() {
            return;
        }

        let mut drained = 0;
        for slot in changed.slots() {
            drain(slot);
            drained += 1;
        }

        let mut s = stats.lock();
        s.batches += 1;
        s.slots_drained += drained;
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        *self.stats.lock()
    }

    /// Stops the worker after a final drain and returns its counters.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop();
        self.stats()
    }

    fn stop(&mut self) {
        // Disconnecting the channel wakes the select.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sync worker panicked");
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::time::Duration;

    fn slow_poll() -> ConsumerConfig {
        ConsumerConfig {
            thread_name: "objsync-test".to_string(),
            idle_poll_ms: 60_000,
        }
    }

    #[test]
    fn test_doorbell_drives_drain() {
        let engine = Engine::new(&EngineConfig::default());
        let a = engine.claim_slot().unwrap();
        let b = engine.claim_slot().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        let worker = SyncWorker::spawn(&engine, &slow_poll(), move |slot| {
            let _ = tx.send((slot, thread::current().name().map(str::to_owned)));
        })
        .unwrap();

        engine.notify_changed(b);
        engine.notify_changed(a);

        let mut seen = Vec::new();
        for _ in 0..2 {
            let (slot, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(name.as_deref(), Some("objsync-test"));
            seen.push(slot);
        }
        seen.sort();
        assert_eq!(seen, vec![a, b]);

        let stats = worker.shutdown();
        assert_eq!(stats.slots_drained, 2);
        assert!(stats.doorbells >= 1);
        assert!(engine.changed_mask().is_empty());
    }

    #[test]
    fn test_idle_poll_picks_up_work() {
        let engine = Engine::new(&EngineConfig::default());
        let slot = engine.claim_slot().unwrap();
        // Swallow the doorbell so only the idle poll can find the change.
        let bell = engine.doorbell();
        engine.notify_changed(slot);
        bell.recv().unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let config = ConsumerConfig {
            idle_poll_ms: 1,
            ..ConsumerConfig::default()
        };
        let worker = SyncWorker::spawn(&engine, &config, move |slot| {
            let _ = tx.send(slot);
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), slot);
        let stats = worker.shutdown();
        assert!(stats.idle_polls >= 1);
        assert_eq!(stats.doorbells, 0);
    }

    #[test]
    fn test_shutdown_without_work() {
        let engine = Engine::new(&EngineConfig::default());
        let worker = SyncWorker::spawn(&engine, &slow_poll(), |_| {}).unwrap();
        assert_eq!(worker.shutdown(), WorkerStats::default());
    }

    #[test]
    fn test_drop_stops_worker() {
        let engine = Engine::new(&EngineConfig::default());
        let worker = SyncWorker::spawn(&engine, &slow_poll(), |_| {}).unwrap();
        drop(worker);
        // The worker's engine handle is gone once the thread has been joined.
        assert_eq!(Arc::strong_count(&engine), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let engine = Engine::new(&EngineConfig::default());
        let config = ConsumerConfig {
            idle_poll_ms: 0,
            ..ConsumerConfig::default()
        };
        assert!(matches!(
            SyncWorker::spawn(&engine, &config, |_| {}),
            Err(SyncError::InvalidConfig(_))
        ));
    }
}
