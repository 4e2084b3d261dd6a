//! Integration tests for the object lock protocol.

use objsync_core::{
    Checked, HandlerTable, LockPolicy, MediaObjectKind, ObjectKind, SyncObject, Unchecked, CONTENTION_BACKOFF_MS,
};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const RECORDER: ObjectKind = ObjectKind::Media(MediaObjectKind::MediaRecorder);

#[derive(Default)]
struct Counter {
    value: u64,
    ready: bool,
}

static COUNTER_HANDLERS: HandlerTable<Counter> = HandlerTable::new();

fn hammer<P: LockPolicy>(object: &Arc<SyncObject<Counter, P>>) {
    let inside = Arc::new(AtomicUsize::new(0));
    let threads = 8;
    let rounds = 2_000;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let object = Arc::clone(object);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..rounds {
                    let mut guard = object.lock_exclusive();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    guard.value += 1;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    guard.unlock();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(object.lock_exclusive().value, threads * rounds);
}

#[test]
fn test_mutual_exclusion_unchecked() {
    let object: Arc<SyncObject<Counter, Unchecked>> =
        Arc::new(SyncObject::new(RECORDER, &COUNTER_HANDLERS, Counter::default()));
    hammer(&object);
}

#[test]
fn test_mutual_exclusion_checked() {
    let object: Arc<SyncObject<Counter, Checked>> =
        Arc::new(SyncObject::new(RECORDER, &COUNTER_HANDLERS, Counter::default()));
    hammer(&object);
    assert!(!object.is_locked_by_current_thread());
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_contended_checked_lock_warns_with_holder_site() {
    let object: Arc<SyncObject<Counter, Checked>> =
        Arc::new(SyncObject::new(RECORDER, &COUNTER_HANDLERS, Counter::default()));
    let (locked_tx, locked_rx) = crossbeam_channel::bounded(0);

    let holder = {
        let object = Arc::clone(&object);
        thread::spawn(move || {
            let (mut guard, line) = (object.lock_exclusive(), line!());
            locked_tx.send(line).unwrap();
            // Well past the whole backoff schedule.
            thread::sleep(Duration::from_millis(400));
            guard.value = 7;
        })
    };

    let held_at = locked_rx.recv().unwrap();
    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt().with_writer(move || sink.clone()).finish();

    let started = Instant::now();
    tracing::subscriber::with_default(subscriber, || {
        let guard = object.lock_exclusive();
        assert_eq!(guard.value, 7);
        assert!(object.is_locked_by_current_thread());
        guard.unlock();
    });
    let elapsed = started.elapsed();
    holder.join().unwrap();

    let backoff: u64 = CONTENTION_BACKOFF_MS.iter().sum();
    assert!(elapsed >= Duration::from_millis(backoff), "blocked only {elapsed:?}");

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    assert!(output.contains("object lock still contended after backoff"), "{output}");
    assert!(output.contains(&format!("{}:{}", file!(), held_at)), "{output}");
}

#[test]
fn test_waiters_reacquire_in_turn() {
    let object: Arc<SyncObject<Counter, Checked>> =
        Arc::new(SyncObject::new(RECORDER, &COUNTER_HANDLERS, Counter::default()));

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let object = Arc::clone(&object);
            thread::spawn(move || {
                let mut guard = object.lock_exclusive();
                guard.wait_while(|counter| !counter.ready);
                assert!(object.is_locked_by_current_thread());
                guard.value += 1;
            })
        })
        .collect();

    {
        let mut guard = object.lock_exclusive();
        guard.ready = true;
        object.broadcast();
    }

    for w in waiters {
        w.join().unwrap();
    }
    assert_eq!(object.lock_exclusive().value, 4);
}

#[test]
#[should_panic(expected = "recursively locked")]
fn test_relocking_own_object_is_fatal() {
    let object: SyncObject<Counter, Checked> = SyncObject::new(RECORDER, &COUNTER_HANDLERS, Counter::default());
    let _outer = object.lock_exclusive();
    let _inner = object.lock_exclusive();
}
