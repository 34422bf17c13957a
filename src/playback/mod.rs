// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tick-driven playback.
//!
//! This module provides the playback core:
//! - Active songs with per-note play/stop state machines
//! - Channels multiplexing many active songs onto a set of listeners
//! - A solo player for fire-and-forget playback to a single listener

pub mod active;
pub mod channel;
pub mod solo;

pub use active::{ActiveSong, NotePlayback};
pub use channel::Channel;
pub use solo::SoloPlayer;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::listener::Listener;
use crate::song::{Category, InstrumentRef, Note};

/// Result of advancing an active song by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The song keeps running
    Active,
    /// The song is done and can be dropped
    Finished,
}

impl TickOutcome {
    pub fn is_active(&self) -> bool {
        *self == TickOutcome::Active
    }

    pub fn is_finished(&self) -> bool {
        *self == TickOutcome::Finished
    }
}

/// How a sustained free-form sound is silenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedStopMode {
    /// Re-issue `play` at volume 0 (sinks that cannot address names in `stop`)
    #[default]
    ZeroVolumeReplay,
    /// Call the sink's `stop`
    Explicit,
}

/// Playback settings shared by every song in an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPolicy {
    /// Category used when a default-category slot is already taken
    pub fallback_category: Category,
    /// Stop strategy for free-form instruments
    pub named_stop: NamedStopMode,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            fallback_category: Category::FALLBACK,
            named_stop: NamedStopMode::default(),
        }
    }
}

/// Send a play event for `note` to one listener
pub(crate) fn emit_play(listener: &dyn Listener, note: &Note, category: Category) {
    trace!(
        listener = %listener.id(),
        instrument = %note.instrument(),
        ?category,
        "play"
    );
    listener.play(note.instrument(), category, note.volume(), note.pitch());
}

/// Send a stop event for `note` to one listener
pub(crate) fn emit_stop(
    listener: &dyn Listener,
    note: &Note,
    category: Category,
    mode: NamedStopMode,
) {
    trace!(
        listener = %listener.id(),
        instrument = %note.instrument(),
        ?category,
        "stop"
    );
    match (note.instrument(), mode) {
        (InstrumentRef::Named(_), NamedStopMode::ZeroVolumeReplay) => {
            listener.play(note.instrument(), category, 0.0, note.pitch());
        }
        _ => listener.stop(note.instrument(), category),
    }
}
