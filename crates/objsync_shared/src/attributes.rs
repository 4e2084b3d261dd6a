//! # Attribute Bits
//!
//! Interface methods report which externally visible attributes of an object
//! they changed as an [`AttributeMask`]. Each bit position is also a column of
//! the handler table.

use bitflags::bitflags;

use crate::constants::ATTRIBUTE_COUNT;

bitflags! {
    /// Set of changed attributes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttributeMask: u32 {
        /// Volume, mute/solo, stereo position, effect send levels.
        const GAIN = 1 << 0;
        /// Callback event mask, marker position, update period.
        const TRANSPORT = 1 << 1;
        /// Requested seek position.
        const POSITION = 1 << 2;
        /// Buffer queue became non-empty while playing.
        const BQ_ENQUEUE = 1 << 3;
        /// Android buffer queue became non-empty while playing.
        const ABQ_ENQUEUE = 1 << 4;
        /// Play state.
        const PLAY_STATE = 1 << 5;
        /// Reserved.
        const RESERVED_6 = 1 << 6;
        /// Reserved.
        const RESERVED_7 = 1 << 7;
    }
}

impl AttributeMask {
    /// Lowest attribute in the set, if any.
    #[inline]
    #[must_use]
    pub fn lowest(self) -> Option<Attribute> {
        if self.is_empty() {
            return None;
        }
        Attribute::from_index(self.bits().trailing_zeros() as usize)
    }
}

/// A single attribute, i.e. one column of the handler table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Attribute {
    /// See [`AttributeMask::GAIN`].
    Gain = 0,
    /// See [`AttributeMask::TRANSPORT`].
    Transport = 1,
    /// See [`AttributeMask::POSITION`].
    Position = 2,
    /// See [`AttributeMask::BQ_ENQUEUE`].
    BqEnqueue = 3,
    /// See [`AttributeMask::ABQ_ENQUEUE`].
    AbqEnqueue = 4,
    /// See [`AttributeMask::PLAY_STATE`].
    PlayState = 5,
    /// See [`AttributeMask::RESERVED_6`].
    Reserved6 = 6,
    /// See [`AttributeMask::RESERVED_7`].
    Reserved7 = 7,
}

impl Attribute {
    /// Every attribute, in bit order.
    pub const ALL: [Self; ATTRIBUTE_COUNT] = [
        Self::Gain,
        Self::Transport,
        Self::Position,
        Self::BqEnqueue,
        Self::AbqEnqueue,
        Self::PlayState,
        Self::Reserved6,
        Self::Reserved7,
    ];

    /// Bit position (column index).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Attribute at a bit position.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < ATTRIBUTE_COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Single-bit mask.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> AttributeMask {
        AttributeMask::from_bits_retain(1 << self as u32)
    }
}

impl From<Attribute> for AttributeMask {
    fn from(attribute: Attribute) -> Self {
        attribute.mask()
    }
}
