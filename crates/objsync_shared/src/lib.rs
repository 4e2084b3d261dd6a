//! # OBJSYNC Shared
//!
//! Identifiers used by both the sync core and the code that defines object
//! kinds and attribute semantics.
//!
//! ## CRITICAL RULE
//!
//! This crate must stay pure data. If you need a lock, put it in
//! `objsync_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod attributes;
pub mod constants;
pub mod error;
pub mod kinds;

pub use attributes::{Attribute, AttributeMask};
pub use constants::{ATTRIBUTE_COUNT, CONTENTION_BACKOFF_MS, MAX_INSTANCES, OBJECT_KIND_COUNT};
pub use error::KindError;
pub use kinds::{AudioObjectKind, MediaObjectKind, ObjectKind, AUDIO_ID_OFFSET};
