// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Listener sink abstraction.
//!
//! This module provides a trait-based abstraction for the audio output a
//! listener hears, allowing different sinks (game clients, loggers, test
//! recorders) to be used interchangeably. A sink is bound to one listener,
//! so it knows where that listener is and where to render the sound.

pub mod recorder;

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::song::{Category, InstrumentRef};

pub use recorder::RecordingListener;

/// Identity of a listener within channels
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Trait for listener sink implementations.
///
/// Sinks are shared between every channel the listener has joined, so
/// both methods take `&self`; implementations handle their own interior
/// mutability. Sink failures are the sink's own concern and are never
/// reported back to the engine.
pub trait Listener: Send + Sync {
    /// Identity used for channel membership
    fn id(&self) -> &ListenerId;

    /// Render a sound at the listener's location.
    ///
    /// # Arguments
    /// * `instrument` - Sound identity to play
    /// * `category` - Output category the sound is played in
    /// * `volume` - Volume (0.0 silences a previously started free-form sound)
    /// * `pitch` - Playback pitch
    fn play(&self, instrument: &InstrumentRef, category: Category, volume: f32, pitch: f32);

    /// Stop a sound previously started in the given category.
    fn stop(&self, instrument: &InstrumentRef, category: Category);
}

/// Shared handle to a listener sink
pub type ListenerHandle = Arc<dyn Listener>;

/// A single event delivered to a listener sink
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    Play {
        instrument: InstrumentRef,
        category: Category,
        volume: f32,
        pitch: f32,
    },
    Stop {
        instrument: InstrumentRef,
        category: Category,
    },
}

impl SoundEvent {
    /// Instrument the event addresses
    pub fn instrument(&self) -> &InstrumentRef {
        match self {
            SoundEvent::Play { instrument, .. } | SoundEvent::Stop { instrument, .. } => {
                instrument
            }
        }
    }

    /// Category the event addresses
    pub fn category(&self) -> Category {
        match self {
            SoundEvent::Play { category, .. } | SoundEvent::Stop { category, .. } => *category,
        }
    }

    pub fn is_play(&self) -> bool {
        matches!(self, SoundEvent::Play { .. })
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, SoundEvent::Stop { .. })
    }
}

/// Listener that writes every event to the log
#[derive(Debug)]
pub struct LogListener {
    id: ListenerId,
}

impl LogListener {
    pub fn new(id: impl Into<ListenerId>) -> Self {
        Self { id: id.into() }
    }
}

impl Listener for LogListener {
    fn id(&self) -> &ListenerId {
        &self.id
    }

    fn play(&self, instrument: &InstrumentRef, category: Category, volume: f32, pitch: f32) {
        info!(
            listener = %self.id,
            %instrument,
            ?category,
            volume,
            pitch,
            "play"
        );
    }

    fn stop(&self, instrument: &InstrumentRef, category: Category) {
        info!(listener = %self.id, %instrument, ?category, "stop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::Sound;

    #[test]
    fn test_listener_id() {
        let id = ListenerId::from("steve");
        assert_eq!(id.as_str(), "steve");
        assert_eq!(id.to_string(), "steve");
        assert!(ListenerId::new("alex") < ListenerId::new("steve"));
    }

    #[test]
    fn test_sound_event_accessors() {
        let play = SoundEvent::Play {
            instrument: Sound::Harp.into(),
            category: Category::Music,
            volume: 1.0,
            pitch: 0.5,
        };
        assert!(play.is_play());
        assert_eq!(play.category(), Category::Music);
        assert_eq!(play.instrument(), &InstrumentRef::Sound(Sound::Harp));

        let stop = SoundEvent::Stop {
            instrument: InstrumentRef::named("custom"),
            category: Category::Master,
        };
        assert!(stop.is_stop());
        assert!(stop.instrument().is_named());
    }

    #[test]
    fn test_log_listener_does_not_panic() {
        let listener = LogListener::new("logger");
        assert_eq!(listener.id().as_str(), "logger");
        listener.play(&Sound::Bell.into(), Category::Master, 1.0, 1.0);
        listener.stop(&Sound::Bell.into(), Category::Master);
    }
}
