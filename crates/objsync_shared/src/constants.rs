//! # Sync Constants
//!
//! Capacities baked into every engine build.
//!
//! **CRITICAL:** handler tables are sized from these values at compile time.
//! Changing them changes the layout of every table.

use crate::kinds::{AudioObjectKind, MediaObjectKind};

// =============================================================================
// ENGINE CAPACITY
// =============================================================================

/// Maximum number of tracked instances per engine.
///
/// One bit per instance in the engine's changed mask (`u32`).
pub const MAX_INSTANCES: u8 = 32;

// =============================================================================
// HANDLER TABLE GEOMETRY
// =============================================================================

/// Number of attribute bit positions (columns of a handler table).
pub const ATTRIBUTE_COUNT: usize = 8;

/// Number of object kinds across both families (rows of a handler table).
pub const OBJECT_KIND_COUNT: usize = MediaObjectKind::COUNT + AudioObjectKind::COUNT;

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Delays (ms) between non-blocking lock attempts before a checked lock
/// reports contention and falls back to blocking.
pub const CONTENTION_BACKOFF_MS: [u64; 5] = [0, 10, 20, 30, 40];
