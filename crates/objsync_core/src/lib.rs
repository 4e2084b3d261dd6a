//! # OBJSYNC Core
//!
//! Per-object locking and attribute-change propagation for a multi-object
//! media engine.
//!
//! - Every engine entity owns an exclusive lock and a condition variable
//! - Attribute changes are resolved synchronously where a handler exists and
//!   deferred to a consumer thread otherwise
//! - The engine hears about an object at most once per pending batch
//!
//! ## Lock Rules
//!
//! 1. **One lock at a time** - never hold two object locks
//! 2. **Engine lock last** - the engine is only locked after the object lock
//!    has been released
//! 3. **Handlers never relock** - a handler runs with its object locked
//!
//! Debug builds (or the `diagnostics` feature) track the owner and call site
//! of every lock and turn misuse into a panic; release builds use a plain
//! mutex.
//!
//! ## Example
//!
//! ```rust,ignore
//! use objsync_core::{Engine, EngineConfig, HandlerTable, SyncObject};
//!
//! static PLAYER: HandlerTable<Player> = HandlerTable::new()
//!     .with(MEDIA_PLAYER, Attribute::Gain, apply_gain);
//!
//! let engine = Engine::new(&EngineConfig::default());
//! let player = SyncObject::attach(&engine, MEDIA_PLAYER, &PLAYER, Player::default())?;
//!
//! let mut guard = player.lock_exclusive();
//! guard.volume = 0.5;
//! guard.unlock_with_report(AttributeMask::GAIN | AttributeMask::POSITION);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod handler;
pub mod lock;
pub mod object;
pub mod propagation;

pub use config::{ConsumerConfig, EngineConfig};
pub use consumer::{SyncWorker, WorkerStats};
pub use engine::{ChangedMask, Engine, EngineState, InstanceSlot};
pub use error::{SyncError, SyncResult};
pub use handler::{AttributeHandler, HandlerTable};
pub use lock::{Checked, DefaultPolicy, LockGuard, LockPolicy, ObjectLock, Unchecked};
pub use object::{ObjectGuard, SyncObject};
pub use propagation::ReportOutcome;

pub use objsync_shared::{
    Attribute, AttributeMask, AudioObjectKind, KindError, MediaObjectKind, ObjectKind, ATTRIBUTE_COUNT,
    CONTENTION_BACKOFF_MS, MAX_INSTANCES, OBJECT_KIND_COUNT,
};
