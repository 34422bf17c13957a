// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! VSE - tick-driven song playback for groups of listeners.
//!
//! Songs are collections of timed notes. The engine runs any number of
//! song instances in named channels and broadcasts their play/stop events
//! to every listener in the channel, driven by one fixed-rate clock.

pub mod config;
pub mod engine;
pub mod listener;
pub mod playback;
pub mod song;
pub mod timing;

pub use config::{EngineConfig, SongFile};
pub use engine::Engine;
pub use listener::{Listener, ListenerHandle, ListenerId, LogListener, RecordingListener, SoundEvent};
pub use playback::{ActiveSong, Channel, NamedStopMode, PlaybackPolicy, SoloPlayer, TickOutcome};
pub use song::{Category, InstrumentRef, Note, Song, SongError, Sound};
pub use timing::{ClockError, ClockHandle, ManualClock, TickRate, TickSource, TokioClock};
