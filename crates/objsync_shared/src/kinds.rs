//! # Object Kinds
//!
//! Lockable objects come from two related API families. The audio family
//! numbers its kinds from `0x1001`, the multimedia family from `0x1`.
//! Handler tables want one contiguous row space, so the audio ids are shifted
//! down by a fixed offset to sit directly after the multimedia ids:
//!
//! ```text
//! raw id            merged id   row
//! 0x1    ..= 0x9    1  ..= 9    0  ..= 8     (multimedia)
//! 0x1001 ..= 0x100A 10 ..= 19   9  ..= 18    (audio)
//! ```

use crate::error::KindError;

/// Offset subtracted from audio ids so they follow the multimedia ids.
pub const AUDIO_ID_OFFSET: u32 = AudioObjectKind::FIRST_ID - MediaObjectKind::LAST_ID - 1;

/// Object kinds of the audio API family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AudioObjectKind {
    /// The engine itself.
    Engine = 0x1001,
    /// LED array device.
    LedDevice = 0x1002,
    /// Vibration device.
    VibraDevice = 0x1003,
    /// PCM/encoded audio player.
    AudioPlayer = 0x1004,
    /// Audio recorder.
    AudioRecorder = 0x1005,
    /// MIDI player.
    MidiPlayer = 0x1006,
    /// 3D listener.
    Listener = 0x1007,
    /// 3D group of players.
    Group3D = 0x1008,
    /// Output mix.
    OutputMix = 0x1009,
    /// Metadata extractor.
    MetadataExtractor = 0x100A,
}

impl AudioObjectKind {
    /// Lowest raw id of the family.
    pub const FIRST_ID: u32 = Self::Engine as u32;
    /// Highest raw id of the family.
    pub const LAST_ID: u32 = Self::MetadataExtractor as u32;
    /// Number of kinds in the family.
    pub const COUNT: usize = (Self::LAST_ID - Self::FIRST_ID + 1) as usize;

    /// Every kind, in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Engine,
        Self::LedDevice,
        Self::VibraDevice,
        Self::AudioPlayer,
        Self::AudioRecorder,
        Self::MidiPlayer,
        Self::Listener,
        Self::Group3D,
        Self::OutputMix,
        Self::MetadataExtractor,
    ];

    /// Raw API id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Decodes a raw API id.
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        if id < Self::FIRST_ID || id > Self::LAST_ID {
            return None;
        }
        Some(Self::ALL[(id - Self::FIRST_ID) as usize])
    }
}

/// Object kinds of the multimedia API family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MediaObjectKind {
    /// The engine itself.
    Engine = 0x1,
    /// LED array device.
    LedDevice = 0x2,
    /// Vibration device.
    VibraDevice = 0x3,
    /// Audio/video player.
    MediaPlayer = 0x4,
    /// Audio/video recorder.
    MediaRecorder = 0x5,
    /// Radio tuner.
    RadioDevice = 0x6,
    /// Output mix.
    OutputMix = 0x7,
    /// Metadata extractor.
    MetadataExtractor = 0x8,
    /// Camera.
    CameraDevice = 0x9,
}

impl MediaObjectKind {
    /// Lowest raw id of the family.
    pub const FIRST_ID: u32 = Self::Engine as u32;
    /// Highest raw id of the family.
    pub const LAST_ID: u32 = Self::CameraDevice as u32;
    /// Number of kinds in the family.
    pub const COUNT: usize = (Self::LAST_ID - Self::FIRST_ID + 1) as usize;

    /// Every kind, in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Engine,
        Self::LedDevice,
        Self::VibraDevice,
        Self::MediaPlayer,
        Self::MediaRecorder,
        Self::RadioDevice,
        Self::OutputMix,
        Self::MetadataExtractor,
        Self::CameraDevice,
    ];

    /// Raw API id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Decodes a raw API id.
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        if id < Self::FIRST_ID || id > Self::LAST_ID {
            return None;
        }
        Some(Self::ALL[(id - Self::FIRST_ID) as usize])
    }
}

/// Kind of a lockable engine object, from either family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Audio family.
    Audio(AudioObjectKind),
    /// Multimedia family.
    Media(MediaObjectKind),
}

impl ObjectKind {
    /// Decodes a raw id from either family.
    ///
    /// # Errors
    ///
    /// Returns [`KindError::UnknownObjectKind`] if the id is outside both
    /// families.
    pub const fn from_raw(raw: u32) -> Result<Self, KindError> {
        if let Some(kind) = MediaObjectKind::from_id(raw) {
            return Ok(Self::Media(kind));
        }
        if let Some(kind) = AudioObjectKind::from_id(raw) {
            return Ok(Self::Audio(kind));
        }
        Err(KindError::UnknownObjectKind(raw))
    }

    /// Raw API id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        match self {
            Self::Audio(kind) => kind.id(),
            Self::Media(kind) => kind.id(),
        }
    }

    /// Row of this kind in a handler table.
    ///
    /// Rows are dense: `0..OBJECT_KIND_COUNT`, multimedia kinds first.
    #[inline]
    #[must_use]
    pub const fn dense_index(self) -> usize {
        let merged = match self {
            Self::Media(kind) => kind.id(),
            Self::Audio(kind) => kind.id() - AUDIO_ID_OFFSET,
        };
        (merged - MediaObjectKind::FIRST_ID) as usize
    }

    /// Row for a raw id that is already known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if `raw` belongs to neither family. A raw id reaching a handler
    /// lookup unvalidated is a configuration error, never a recoverable one.
    #[must_use]
    pub const fn dense_index_of_raw(raw: u32) -> usize {
        match Self::from_raw(raw) {
            Ok(kind) => kind.dense_index(),
            Err(_) => panic!("object kind id outside both families"),
        }
    }

    /// Inverse of [`ObjectKind::dense_index`].
    #[must_use]
    pub const fn from_dense_index(index: usize) -> Option<Self> {
        if index < MediaObjectKind::COUNT {
            Some(Self::Media(MediaObjectKind::ALL[index]))
        } else if index < MediaObjectKind::COUNT + AudioObjectKind::COUNT {
            Some(Self::Audio(AudioObjectKind::ALL[index - MediaObjectKind::COUNT]))
        } else {
            None
        }
    }

    /// Every kind, in row order.
    pub fn all() -> impl Iterator<Item = Self> {
        MediaObjectKind::ALL
            .into_iter()
            .map(Self::Media)
            .chain(AudioObjectKind::ALL.into_iter().map(Self::Audio))
    }

    /// Returns true for the engine kind of either family.
    #[inline]
    #[must_use]
    pub const fn is_engine(self) -> bool {
        matches!(
            self,
            Self::Audio(AudioObjectKind::Engine) | Self::Media(MediaObjectKind::Engine)
        )
    }
}

impl From<AudioObjectKind> for ObjectKind {
    fn from(kind: AudioObjectKind) -> Self {
        Self::Audio(kind)
    }
}

impl From<MediaObjectKind> for ObjectKind {
    fn from(kind: MediaObjectKind) -> Self {
        Self::Media(kind)
    }
}

impl TryFrom<u32> for ObjectKind {
    type Error = KindError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::OBJECT_KIND_COUNT;

    #[test]
    fn test_offset_matches_family_bounds() {
        assert_eq!(AUDIO_ID_OFFSET, 0x1001 - 0x9 - 1);
        assert_eq!(OBJECT_KIND_COUNT, 19);
    }

    #[test]
    fn test_dense_mapping_is_unique_and_gap_free() {
        let mut seen = [false; OBJECT_KIND_COUNT];
        for kind in ObjectKind::all() {
            let row = kind.dense_index();
            assert!(row < OBJECT_KIND_COUNT, "{kind:?} mapped past the table");
            assert!(!seen[row], "{kind:?} collides at row {row}");
            seen[row] = true;
        }
        assert!(seen.iter().all(|&hit| hit), "gap in dense rows: {seen:?}");
    }

    #[test]
    fn test_dense_mapping_round_trips_every_row() {
        for row in 0..OBJECT_KIND_COUNT {
            let kind = ObjectKind::from_dense_index(row).unwrap();
            assert_eq!(kind.dense_index(), row);
        }
        assert_eq!(ObjectKind::from_dense_index(OBJECT_KIND_COUNT), None);
    }

    #[test]
    fn test_family_boundaries() {
        assert_eq!(ObjectKind::Media(MediaObjectKind::Engine).dense_index(), 0);
        assert_eq!(ObjectKind::Media(MediaObjectKind::MediaPlayer).dense_index(), 3);
        assert_eq!(ObjectKind::Media(MediaObjectKind::CameraDevice).dense_index(), 8);
        assert_eq!(ObjectKind::Audio(AudioObjectKind::Engine).dense_index(), 9);
        assert_eq!(ObjectKind::Audio(AudioObjectKind::MetadataExtractor).dense_index(), 18);
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(
            ObjectKind::from_raw(0x1004),
            Ok(ObjectKind::Audio(AudioObjectKind::AudioPlayer))
        );
        assert_eq!(
            ObjectKind::try_from(0x9_u32),
            Ok(ObjectKind::Media(MediaObjectKind::CameraDevice))
        );
        for raw in [0, 0xA, 0x1000, 0x100B, u32::MAX] {
            assert_eq!(ObjectKind::from_raw(raw), Err(KindError::UnknownObjectKind(raw)));
        }
    }

    #[test]
    fn test_raw_round_trip() {
        for kind in ObjectKind::all() {
            assert_eq!(ObjectKind::from_raw(kind.raw()), Ok(kind));
            assert_eq!(ObjectKind::dense_index_of_raw(kind.raw()), kind.dense_index());
        }
    }

    #[test]
    #[should_panic(expected = "outside both families")]
    fn test_invalid_raw_row_is_fatal() {
        let _ = ObjectKind::dense_index_of_raw(0x2000);
    }

    #[test]
    fn test_engine_kinds() {
        assert!(ObjectKind::from(AudioObjectKind::Engine).is_engine());
        assert!(ObjectKind::from(MediaObjectKind::Engine).is_engine());
        assert!(!ObjectKind::from(AudioObjectKind::OutputMix).is_engine());
    }
}
