//! Chapter-relative playback positions and playback rates.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Playhead position inside one spine element.
///
/// `playhead_offset` is relative to the element's media item, never
/// cumulative across chapters. Locations of different audiobooks are not
/// comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterLocation {
    pub audiobook_id: String,
    pub number: u32,
    pub part: u32,
    pub duration: Duration,
    pub start_offset: Duration,
    pub playhead_offset: Duration,
    pub title: Option<String>,
}

impl ChapterLocation {
    /// Same audiobook, chapter, and part, regardless of the playhead.
    pub fn is_same_chapter(&self, other: &ChapterLocation) -> bool {
        self.audiobook_id == other.audiobook_id
            && self.number == other.number
            && self.part == other.part
    }

    /// Copy with the playhead moved to `offset`, clamped to the chapter.
    pub fn with_playhead(&self, offset: Duration) -> Self {
        Self {
            playhead_offset: offset.min(self.duration),
            ..self.clone()
        }
    }

    pub fn time_remaining(&self) -> Duration {
        self.duration.saturating_sub(self.playhead_offset)
    }
}

impl PartialOrd for ChapterLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.audiobook_id != other.audiobook_id {
            return None;
        }

        let key = |l: &Self| (l.part, l.number, l.start_offset + l.playhead_offset);
        match key(self).cmp(&key(other)) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }
}

/// Supported playback speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackRate {
    ThreeQuartersTime,
    #[default]
    NormalTime,
    OneAndAQuarterTime,
    OneAndAHalfTime,
    DoubleTime,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 5] = [
        PlaybackRate::ThreeQuartersTime,
        PlaybackRate::NormalTime,
        PlaybackRate::OneAndAQuarterTime,
        PlaybackRate::OneAndAHalfTime,
        PlaybackRate::DoubleTime,
    ];

    /// Engine rate multiplier.
    pub fn value(self) -> f32 {
        match self {
            PlaybackRate::ThreeQuartersTime => 0.75,
            PlaybackRate::NormalTime => 1.0,
            PlaybackRate::OneAndAQuarterTime => 1.25,
            PlaybackRate::OneAndAHalfTime => 1.5,
            PlaybackRate::DoubleTime => 2.0,
        }
    }

    /// Rate for an exact engine multiplier.
    pub fn from_value(value: f32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.value() == value)
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.value())
    }
}
