//! # Attribute Handler Table
//!
//! Dense lookup from (object kind, attribute bit) to the handler that resolves
//! that attribute synchronously while the object is locked.
//!
//! ```text
//!                 GAIN  TRANSPORT  POSITION  ...  RESERVED_7
//! row 0  (media engine)   -      -         -           -
//! row 3  (media player)   fn     -         fn          -
//! ...
//! row 18 (audio metadata) -      -         -           -
//! ```
//!
//! Tables are built with a `const fn` builder and live in `static` items, so
//! nothing is mutated after startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! static PLAYER_HANDLERS: HandlerTable<PlayerState> = HandlerTable::new()
//!     .with(ObjectKind::Audio(AudioObjectKind::AudioPlayer), Attribute::Gain, apply_gain)
//!     .with(ObjectKind::Audio(AudioObjectKind::AudioPlayer), Attribute::Position, seek);
//! ```

use std::fmt;

use objsync_shared::{Attribute, AttributeMask, ObjectKind, ATTRIBUTE_COUNT, OBJECT_KIND_COUNT};

/// Resolves one attribute of a locked object.
///
/// Returns the part of the dispatched bit it fully handled. An empty mask
/// means the attribute still needs asynchronous processing.
///
/// Handlers run with the object lock held and must not lock the same object
/// again.
pub type AttributeHandler<S> = fn(&mut S) -> AttributeMask;

/// Handler lookup for every (kind, attribute) pair.
pub struct HandlerTable<S> {
    rows: [[Option<AttributeHandler<S>>; ATTRIBUTE_COUNT]; OBJECT_KIND_COUNT],
}

impl<S> HandlerTable<S> {
    /// Table without any handler: every attribute defers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: [[None; ATTRIBUTE_COUNT]; OBJECT_KIND_COUNT],
        }
    }

    /// Registers `handler` for `attribute` of objects of `kind`.
    ///
    /// A later registration for the same pair replaces the earlier one.
    #[must_use]
    pub const fn with(mut self, kind: ObjectKind, attribute: Attribute, handler: AttributeHandler<S>) -> Self {
        self.rows[kind.dense_index()][attribute.index()] = Some(handler);
        self
    }

    /// Handler at a raw (row, bit) position.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, bit: usize) -> Option<AttributeHandler<S>> {
        self.rows[row][bit]
    }

    /// Handler for `attribute` of objects of `kind`.
    #[inline]
    #[must_use]
    pub fn handler(&self, kind: ObjectKind, attribute: Attribute) -> Option<AttributeHandler<S>> {
        self.get(kind.dense_index(), attribute.index())
    }

    /// Attributes of `kind` that have a handler.
    #[must_use]
    pub fn handled(&self, kind: ObjectKind) -> AttributeMask {
        Attribute::ALL
            .into_iter()
            .filter(|attribute| self.handler(kind, *attribute).is_some())
            .fold(AttributeMask::empty(), |mask, attribute| mask | attribute.mask())
    }
}

impl<S> Default for HandlerTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for HandlerTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in ObjectKind::all() {
            let handled = self.handled(kind);
            if !handled.is_empty() {
                map.entry(&kind, &handled);
            }
        }
        map.finish()
    }
}
