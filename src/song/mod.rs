// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song data model.
//!
//! A song is a named, ordered collection of notes. All timing is in
//! absolute ticks; the tempo is carried as metadata only.

pub mod note;

pub use note::{Category, InstrumentRef, Note, Sound};

use thiserror::Error;

/// Errors raised while building songs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SongError {
    /// End tick lies before start tick
    #[error("note ends at tick {end} before it starts at tick {start}")]
    InvalidRange { start: u32, end: u32 },
    /// Volume is negative or not a number
    #[error("invalid note volume: {0}")]
    InvalidVolume(f32),
    /// Pitch is not a number
    #[error("invalid note pitch: {0}")]
    InvalidPitch(f32),
}

/// An immutable sequence of notes plus a tempo tag
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    title: String,
    tempo: u32,
    notes: Vec<Note>,
}

impl Song {
    /// Create an empty song
    pub fn new(title: impl Into<String>, tempo: u32) -> Self {
        Self {
            title: title.into(),
            tempo,
            notes: Vec::new(),
        }
    }

    /// Append a note (insertion order is kept)
    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    /// Builder form of `add_note`
    pub fn with_note(mut self, note: Note) -> Self {
        self.add_note(note);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Highest end tick over all notes (0 for an empty song)
    pub fn max_end_tick(&self) -> u32 {
        self.notes.iter().map(Note::end_tick).max().unwrap_or(0)
    }
}
