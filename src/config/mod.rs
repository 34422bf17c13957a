// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for VSE.
//!
//! This module provides the engine settings (TOML) and a YAML song
//! description used by the command-line front end to author songs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::playback::{NamedStopMode, PlaybackPolicy};
use crate::song::{Category, InstrumentRef, Note, Song, Sound};
use crate::timing::{TickRate, DEFAULT_TICKS_PER_SECOND};

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Clock rate in ticks per second
    pub tick_rate: u32,
    /// Ticks before the first clock fire
    pub start_delay_ticks: u64,
    /// Ticks between clock fires
    pub period_ticks: u64,
    /// Category used when a default-category slot is already taken.
    /// Must not be the default category itself.
    pub fallback_category: Category,
    /// How sustained free-form sounds are silenced
    pub named_stop: NamedStopMode,
    /// Cancel the clock while no channel exists
    pub release_clock_when_idle: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICKS_PER_SECOND,
            start_delay_ticks: 0,
            period_ticks: 1,
            fallback_category: Category::FALLBACK,
            named_stop: NamedStopMode::default(),
            release_clock_when_idle: true,
        }
    }
}

impl EngineConfig {
    /// Load engine settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate engine settings from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.fallback_category.is_default() {
            anyhow::bail!(
                "fallback_category must differ from the default category '{:?}'",
                Category::DEFAULT
            );
        }
        if self.period_ticks == 0 {
            anyhow::bail!("period_ticks must be at least 1");
        }
        Ok(())
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration to TOML")
    }

    pub fn rate(&self) -> TickRate {
        TickRate::new(self.tick_rate)
    }

    pub fn policy(&self) -> PlaybackPolicy {
        PlaybackPolicy {
            fallback_category: self.fallback_category,
            named_stop: self.named_stop,
        }
    }
}

/// Root of a YAML song description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongFile {
    /// Song title
    pub title: String,
    /// Tempo tag (metadata only)
    #[serde(default = "default_tempo")]
    pub tempo: u32,
    /// Note definitions
    #[serde(default)]
    pub notes: Vec<NoteConfig>,
}

fn default_tempo() -> u32 {
    120
}
fn default_pitch() -> f32 {
    1.0
}
fn default_volume() -> f32 {
    1.0
}

/// One note in a song description
///
/// Exactly one of `sound` (catalog) or `name` (free-form) must be given.
/// `end` defaults to `start`, giving an instantaneous note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<Sound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Category,
    pub start: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl NoteConfig {
    fn instrument(&self) -> Result<InstrumentRef> {
        match (&self.sound, &self.name) {
            (Some(sound), None) => Ok(InstrumentRef::Sound(*sound)),
            (None, Some(name)) => Ok(InstrumentRef::named(name.clone())),
            (Some(_), Some(_)) => anyhow::bail!("note has both 'sound' and 'name'"),
            (None, None) => anyhow::bail!("note needs either 'sound' or 'name'"),
        }
    }

    /// Build a validated note
    pub fn to_note(&self) -> Result<Note> {
        let instrument = self.instrument()?;
        let end = self.end.unwrap_or(self.start);
        Ok(Note::new(
            instrument,
            self.category,
            self.start,
            end,
            self.pitch,
            self.volume,
        )?)
    }
}

impl SongFile {
    /// Load a song description from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read song file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a song description from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML song")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize song to YAML")
    }

    /// Build the song, validating every note
    pub fn to_song(&self) -> Result<Song> {
        let mut song = Song::new(self.title.clone(), self.tempo);
        for (index, config) in self.notes.iter().enumerate() {
            let note = config
                .to_note()
                .with_context(|| format!("Invalid note #{} in '{}'", index + 1, self.title))?;
            song.add_note(note);
        }
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SONG_YAML: &str = r#"
title: Lobby Theme
tempo: 96
notes:
  - sound: harp
    start: 0
    end: 8
    pitch: 1.2
  - sound: base_drum
    category: blocks
    start: 4
  - name: custom.choir
    start: 2
    end: 6
    volume: 0.5
"#;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.period_ticks, 1);
        assert_eq!(config.fallback_category, Category::Music);
        assert_eq!(config.named_stop, NamedStopMode::ZeroVolumeReplay);
        assert!(config.release_clock_when_idle);
        assert_eq!(config.rate().ticks_per_second(), 20);
    }

    #[test]
    fn test_engine_config_partial_toml() {
        let config = EngineConfig::from_toml(
            r#"
tick_rate = 40
fallback_category = "record"
named_stop = "explicit"
"#,
        )
        .unwrap();
        assert_eq!(config.tick_rate, 40);
        assert_eq!(config.period_ticks, 1);
        assert_eq!(
            config.policy(),
            PlaybackPolicy {
                fallback_category: Category::Record,
                named_stop: NamedStopMode::Explicit,
            }
        );
    }

    #[test]
    fn test_engine_config_rejects_default_fallback() {
        let err = EngineConfig::from_toml("fallback_category = \"master\"").unwrap_err();
        assert!(err.to_string().contains("fallback_category"));

        assert!(EngineConfig::from_toml("period_ticks = 0").is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_engine_config_toml_roundtrip() {
        let config = EngineConfig {
            tick_rate: 10,
            release_clock_when_idle: false,
            ..Default::default()
        };
        let parsed = EngineConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_engine_config_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "start_delay_ticks = 5").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.start_delay_ticks, 5);

        assert!(EngineConfig::load("/nonexistent/engine.toml").is_err());
    }

    #[test]
    fn test_song_file_parse() {
        let file = SongFile::from_yaml(SONG_YAML).unwrap();
        assert_eq!(file.title, "Lobby Theme");
        assert_eq!(file.tempo, 96);
        assert_eq!(file.notes.len(), 3);

        let song = file.to_song().unwrap();
        assert_eq!(song.len(), 3);
        assert_eq!(song.max_end_tick(), 8);

        let drum = &song.notes()[1];
        assert_eq!(drum.instrument(), &InstrumentRef::Sound(Sound::BaseDrum));
        assert_eq!(drum.category(), Category::Blocks);
        assert!(!drum.is_sustained());

        let choir = &song.notes()[2];
        assert_eq!(choir.instrument(), &InstrumentRef::named("custom.choir"));
        assert_eq!(choir.volume(), 0.5);
        assert_eq!(choir.category(), Category::Master);
    }

    #[test]
    fn test_song_file_rejects_reversed_note() {
        let yaml = r#"
title: Broken
notes:
  - sound: hat
    start: 9
    end: 3
"#;
        let err = SongFile::from_yaml(yaml).unwrap().to_song().unwrap_err();
        assert!(err.to_string().contains("Invalid note #1"));
    }

    #[test]
    fn test_song_file_needs_one_instrument() {
        let both = r#"
title: Both
notes:
  - sound: hat
    name: custom.hat
    start: 0
"#;
        assert!(SongFile::from_yaml(both).unwrap().to_song().is_err());

        let neither = r#"
title: Neither
notes:
  - start: 0
"#;
        assert!(SongFile::from_yaml(neither).unwrap().to_song().is_err());
    }

    #[test]
    fn test_song_file_load() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SONG_YAML.as_bytes()).unwrap();
        let song = SongFile::load(file.path()).unwrap().to_song().unwrap();
        assert_eq!(song.title(), "Lobby Theme");
    }
}
