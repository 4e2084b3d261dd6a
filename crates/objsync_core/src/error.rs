//! # Sync Error Types
//!
//! Recoverable failures of the sync core. These only arise while building
//! engines and objects or loading configuration; misuse of a lock is a
//! protocol violation and panics instead.

use objsync_shared::KindError;
use thiserror::Error;

/// Errors that can occur while setting up synchronized objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A raw object kind id could not be decoded.
    #[error(transparent)]
    Kind(#[from] KindError),

    /// Every instance slot of the engine is taken.
    #[error("engine full: all {capacity} instance slots are claimed")]
    EngineFull {
        /// Number of slots the engine was configured with.
        capacity: u8,
    },

    /// Slot number outside `1..=capacity`.
    #[error("instance slot {slot} outside engine capacity {capacity}")]
    SlotOutOfRange {
        /// The offending slot.
        slot: u8,
        /// Number of slots the engine was configured with.
        capacity: u8,
    },

    /// The requested instance slot already belongs to another object.
    #[error("instance slot {slot} is already claimed")]
    SlotTaken {
        /// The requested slot.
        slot: u8,
    },

    /// Engines must be built with an engine kind from either family.
    #[error("object kind {kind:#x} is not an engine kind")]
    NotAnEngine {
        /// Raw id of the rejected kind.
        kind: u32,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The consumer thread could not be started.
    #[error("failed to spawn sync worker: {0}")]
    WorkerSpawn(String),
}

/// Result type for sync setup operations.
pub type SyncResult<T> = Result<T, SyncError>;
