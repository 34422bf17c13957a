// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Running song instances.
//!
//! An active song owns one playback entry per note and turns each tick
//! into play and stop events for the listeners it is given.

use std::sync::Arc;

use tracing::debug;

use super::{emit_play, emit_stop, PlaybackPolicy, TickOutcome};
use crate::listener::{Listener, ListenerHandle};
use crate::song::{Category, InstrumentRef, Song};

/// Runtime state of one note within an active song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePlayback {
    is_playing: bool,
    category_used: Category,
}

impl NotePlayback {
    fn new(category: Category) -> Self {
        Self {
            is_playing: false,
            category_used: category,
        }
    }

    /// Check if the note has been started and not yet stopped
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Category the note was last started in
    pub fn category_used(&self) -> Category {
        self.category_used
    }
}

/// A running instance of a song
#[derive(Debug, Clone)]
pub struct ActiveSong {
    id: String,
    song: Arc<Song>,
    looping: bool,
    current_tick: u32,
    stopped: bool,
    /// One entry per note, same order as the song's notes
    playbacks: Vec<NotePlayback>,
    max_end_tick: u32,
    loops: u64,
    policy: PlaybackPolicy,
}

impl ActiveSong {
    /// Create an active song at tick 0 with every note idle
    pub fn new(id: impl Into<String>, song: Arc<Song>, looping: bool) -> Self {
        Self::with_policy(id, song, looping, PlaybackPolicy::default())
    }

    pub fn with_policy(
        id: impl Into<String>,
        song: Arc<Song>,
        looping: bool,
        policy: PlaybackPolicy,
    ) -> Self {
        let playbacks = song
            .notes()
            .iter()
            .map(|note| NotePlayback::new(note.category()))
            .collect();
        let max_end_tick = song.max_end_tick();

        Self {
            id: id.into(),
            song,
            looping,
            current_tick: 0,
            stopped: false,
            playbacks,
            max_end_tick,
            loops: 0,
            policy,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    /// Number of completed loop iterations
    pub fn loop_count(&self) -> u64 {
        self.loops
    }

    /// Playback entry for the note at `index`
    pub fn playback(&self, index: usize) -> Option<&NotePlayback> {
        self.playbacks.get(index)
    }

    /// Number of sustained notes currently sounding
    pub fn playing_count(&self) -> usize {
        self.playbacks.iter().filter(|p| p.is_playing).count()
    }

    /// Flag the song as stopped; stop events go out on the next tick
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Advance by one tick, emitting events to `listeners`
    pub fn tick(&mut self, listeners: &[ListenerHandle]) -> TickOutcome {
        if self.stopped {
            self.stop_all_playing(listeners);
            return TickOutcome::Finished;
        }

        let song = Arc::clone(&self.song);
        for (index, note) in song.notes().iter().enumerate() {
            if !self.playbacks[index].is_playing && self.current_tick == note.start_tick() {
                let category = self.pick_category_for(note.instrument(), note.category());
                for listener in listeners {
                    emit_play(listener.as_ref(), note, category);
                }
                if note.is_sustained() {
                    let playback = &mut self.playbacks[index];
                    playback.is_playing = true;
                    playback.category_used = category;
                }
            }

            let playback = &mut self.playbacks[index];
            if playback.is_playing && self.current_tick >= note.end_tick() && note.is_sustained() {
                for listener in listeners {
                    emit_stop(
                        listener.as_ref(),
                        note,
                        playback.category_used,
                        self.policy.named_stop,
                    );
                }
                playback.is_playing = false;
            }
        }

        self.current_tick += 1;

        if self.current_tick > self.max_end_tick {
            // Loop boundary or natural end: nothing may keep sounding past it
            self.stop_all_playing(listeners);
            if self.looping {
                self.current_tick = 0;
                self.loops += 1;
                debug!(id = %self.id, loops = self.loops, "song looped");
                return TickOutcome::Active;
            }
            self.stopped = true;
            debug!(id = %self.id, "song finished");
            return TickOutcome::Finished;
        }

        TickOutcome::Active
    }

    /// Stop every sounding note for one listener only.
    ///
    /// Playback state is left alone: the notes keep sounding for every
    /// other listener.
    pub fn stop_for_listener(&self, listener: &dyn Listener) {
        for (note, playback) in self.song.notes().iter().zip(&self.playbacks) {
            if playback.is_playing {
                emit_stop(listener, note, playback.category_used, self.policy.named_stop);
            }
        }
    }

    /// Resolve the category a note start should use.
    ///
    /// Explicit categories are honored as-is. A default-category start
    /// moves to the fallback category when this song already has the same
    /// instrument sounding in the default category.
    fn pick_category_for(&self, instrument: &InstrumentRef, declared: Category) -> Category {
        if !declared.is_default() {
            return declared;
        }

        let taken = self
            .song
            .notes()
            .iter()
            .zip(&self.playbacks)
            .any(|(note, playback)| {
                playback.is_playing
                    && playback.category_used.is_default()
                    && note.instrument() == instrument
            });

        if taken {
            self.policy.fallback_category
        } else {
            Category::DEFAULT
        }
    }

    fn stop_all_playing(&mut self, listeners: &[ListenerHandle]) {
        let song = Arc::clone(&self.song);
        for (note, playback) in song.notes().iter().zip(self.playbacks.iter_mut()) {
            if !playback.is_playing {
                continue;
            }
            for listener in listeners {
                emit_stop(
                    listener.as_ref(),
                    note,
                    playback.category_used,
                    self.policy.named_stop,
                );
            }
            playback.is_playing = false;
        }
    }
}
