//! # Propagation Benchmark
//!
//! Measures the cost of a reporting unlock:
//! 1. Plain lock/unlock (baseline)
//! 2. Reporting unlock with every bit resolved synchronously
//! 3. Reporting unlock that defers and notifies the engine
//!
//! Dispatch cost should scale with the number of set bits, not with
//! `ATTRIBUTE_COUNT`.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use objsync_core::{
    Attribute, AttributeMask, Engine, EngineConfig, HandlerTable, MediaObjectKind, ObjectKind, SyncObject, Unchecked,
};

const PLAYER: ObjectKind = ObjectKind::Media(MediaObjectKind::MediaPlayer);

#[derive(Default)]
struct Player {
    applied: u64,
}

fn resolve<const BIT: usize>(player: &mut Player) -> AttributeMask {
    player.applied += 1;
    AttributeMask::from_bits_retain(1 << BIT)
}

fn defer(_: &mut Player) -> AttributeMask {
    AttributeMask::empty()
}

static RESOLVING: HandlerTable<Player> = HandlerTable::new()
    .with(PLAYER, Attribute::Gain, resolve::<0>)
    .with(PLAYER, Attribute::Transport, resolve::<1>)
    .with(PLAYER, Attribute::Position, resolve::<2>)
    .with(PLAYER, Attribute::BqEnqueue, resolve::<3>)
    .with(PLAYER, Attribute::AbqEnqueue, resolve::<4>)
    .with(PLAYER, Attribute::PlayState, resolve::<5>)
    .with(PLAYER, Attribute::Reserved6, resolve::<6>)
    .with(PLAYER, Attribute::Reserved7, resolve::<7>);

static DEFERRING: HandlerTable<Player> = HandlerTable::new().with(PLAYER, Attribute::Position, defer);

/// Baseline: lock and unlock without reporting.
fn bench_plain_unlock(c: &mut Criterion) {
    let object: SyncObject<Player, Unchecked> = SyncObject::new(PLAYER, &RESOLVING, Player::default());

    c.bench_function("plain_unlock", |b| {
        b.iter(|| {
            let mut guard = object.lock_exclusive();
            guard.applied = black_box(guard.applied);
            guard.unlock();
        });
    });
}

/// Synchronous dispatch for 1, 2, 4 and 8 set bits.
fn bench_resolved_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolved_report");
    let object: SyncObject<Player, Unchecked> = SyncObject::new(PLAYER, &RESOLVING, Player::default());

    for bits in [0b1_u32, 0b101, 0b1010_0101, 0xFF] {
        group.bench_with_input(BenchmarkId::from_parameter(bits.count_ones()), &bits, |b, &bits| {
            b.iter(|| {
                let outcome = object
                    .lock_exclusive()
                    .unlock_with_report(black_box(AttributeMask::from_bits_retain(bits)));
                black_box(outcome);
            });
        });
    }

    group.finish();
}

/// Deferred attribute: dirty-mask update plus engine notification each round.
fn bench_deferred_report(c: &mut Criterion) {
    let engine = Engine::new(&EngineConfig::default());
    let object: SyncObject<Player, Unchecked> =
        match SyncObject::attach(&engine, PLAYER, &DEFERRING, Player::default()) {
            Ok(object) => object,
            Err(e) => panic!("attach failed: {e}"),
        };
    let bell = engine.doorbell();

    c.bench_function("deferred_report_and_drain", |b| {
        b.iter(|| {
            let outcome = object.lock_exclusive().unlock_with_report(AttributeMask::POSITION);
            black_box(outcome);
            // Drain like a consumer so the next round notifies again.
            let _ = bell.try_recv();
            black_box(engine.take_changed());
            black_box(object.take_dirty());
        });
    });
}

criterion_group!(benches, bench_plain_unlock, bench_resolved_report, bench_deferred_report);
criterion_main!(benches);
