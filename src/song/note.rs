// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Notes and the sound identities they reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SongError;

/// Well-known sound catalog (note block instruments)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sound {
    Harp,
    Bass,
    BaseDrum,
    Snare,
    Hat,
    Guitar,
    Flute,
    Bell,
    Chime,
    Xylophone,
    IronXylophone,
    CowBell,
    Didgeridoo,
    Bit,
    Banjo,
    Pling,
}

impl Sound {
    /// Every sound in the catalog
    pub const ALL: [Sound; 16] = [
        Sound::Harp,
        Sound::Bass,
        Sound::BaseDrum,
        Sound::Snare,
        Sound::Hat,
        Sound::Guitar,
        Sound::Flute,
        Sound::Bell,
        Sound::Chime,
        Sound::Xylophone,
        Sound::IronXylophone,
        Sound::CowBell,
        Sound::Didgeridoo,
        Sound::Bit,
        Sound::Banjo,
        Sound::Pling,
    ];

    /// Resource key the audio sink knows this sound by
    pub fn key(&self) -> &'static str {
        match self {
            Sound::Harp => "block.note_block.harp",
            Sound::Bass => "block.note_block.bass",
            Sound::BaseDrum => "block.note_block.basedrum",
            Sound::Snare => "block.note_block.snare",
            Sound::Hat => "block.note_block.hat",
            Sound::Guitar => "block.note_block.guitar",
            Sound::Flute => "block.note_block.flute",
            Sound::Bell => "block.note_block.bell",
            Sound::Chime => "block.note_block.chime",
            Sound::Xylophone => "block.note_block.xylophone",
            Sound::IronXylophone => "block.note_block.iron_xylophone",
            Sound::CowBell => "block.note_block.cow_bell",
            Sound::Didgeridoo => "block.note_block.didgeridoo",
            Sound::Bit => "block.note_block.bit",
            Sound::Banjo => "block.note_block.banjo",
            Sound::Pling => "block.note_block.pling",
        }
    }

    /// Look up a catalog sound by its resource key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.key() == key)
    }
}

/// Output grouping used by the sink for independent volume/stop control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Shared slot, subject to conflict resolution
    #[default]
    Master,
    Music,
    Record,
    Weather,
    Blocks,
    Hostile,
    Neutral,
    Players,
    Ambient,
    Voice,
}

impl Category {
    /// The shared category that needs conflict resolution
    pub const DEFAULT: Category = Category::Master;

    /// Category used when the default slot is already taken
    pub const FALLBACK: Category = Category::Music;

    /// Check if this is the shared default category
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

/// Sound identity of a note
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrumentRef {
    /// Sound from the closed catalog
    Sound(Sound),
    /// Free-form sound name
    Named(String),
}

impl InstrumentRef {
    /// Create a free-form instrument reference
    pub fn named(name: impl Into<String>) -> Self {
        InstrumentRef::Named(name.into())
    }

    /// Get the catalog sound, if this is one
    pub fn as_sound(&self) -> Option<Sound> {
        match self {
            InstrumentRef::Sound(sound) => Some(*sound),
            InstrumentRef::Named(_) => None,
        }
    }

    /// Check if this is a free-form name
    pub fn is_named(&self) -> bool {
        matches!(self, InstrumentRef::Named(_))
    }
}

impl From<Sound> for InstrumentRef {
    fn from(sound: Sound) -> Self {
        InstrumentRef::Sound(sound)
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentRef::Sound(sound) => f.write_str(sound.key()),
            InstrumentRef::Named(name) => f.write_str(name),
        }
    }
}

/// A single timed sound event within a song
///
/// A note whose start and end tick are equal is instantaneous: it is played
/// once and never has to be stopped. Any other note is sustained and gets an
/// explicit stop at its end tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    instrument: InstrumentRef,
    category: Category,
    start_tick: u32,
    end_tick: u32,
    pitch: f32,
    volume: f32,
}

impl Note {
    /// Create a validated note
    pub fn new(
        instrument: impl Into<InstrumentRef>,
        category: Category,
        start_tick: u32,
        end_tick: u32,
        pitch: f32,
        volume: f32,
    ) -> Result<Self, SongError> {
        if end_tick < start_tick {
            return Err(SongError::InvalidRange {
                start: start_tick,
                end: end_tick,
            });
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(SongError::InvalidVolume(volume));
        }
        if !pitch.is_finite() {
            return Err(SongError::InvalidPitch(pitch));
        }

        Ok(Self {
            instrument: instrument.into(),
            category,
            start_tick,
            end_tick,
            pitch,
            volume,
        })
    }

    /// Create an instantaneous note in the default category
    pub fn instant(
        instrument: impl Into<InstrumentRef>,
        tick: u32,
        pitch: f32,
        volume: f32,
    ) -> Result<Self, SongError> {
        Self::new(instrument, Category::DEFAULT, tick, tick, pitch, volume)
    }

    pub fn instrument(&self) -> &InstrumentRef {
        &self.instrument
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn start_tick(&self) -> u32 {
        self.start_tick
    }

    pub fn end_tick(&self) -> u32 {
        self.end_tick
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Check if the note must be explicitly stopped
    pub fn is_sustained(&self) -> bool {
        self.end_tick > self.start_tick
    }

    /// Length in ticks (0 for instantaneous notes)
    pub fn duration(&self) -> u32 {
        self.end_tick - self.start_tick
    }
}
