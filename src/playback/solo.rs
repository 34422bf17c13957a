// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fire-and-forget playback of one song to one listener.
//!
//! The solo player only fires note starts: sustained notes are never
//! stopped and the song never loops. It runs on its own clock
//! subscription, independent of any engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::emit_play;
use crate::listener::ListenerHandle;
use crate::song::Song;
use crate::timing::{ClockError, ClockHandle, TickSource};

#[derive(Debug, Default)]
struct SoloState {
    current_tick: u32,
    playing: bool,
    subscription: Option<ClockHandle>,
}

impl SoloState {
    fn cancel(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.cancel();
        }
    }
}

/// Plays a song to a single listener
pub struct SoloPlayer {
    song: Arc<Song>,
    state: Arc<Mutex<SoloState>>,
}

impl SoloPlayer {
    pub fn new(song: Arc<Song>) -> Self {
        Self {
            song,
            state: Arc::new(Mutex::new(SoloState::default())),
        }
    }

    fn lock(state: &Mutex<SoloState>) -> MutexGuard<'_, SoloState> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start playing to `listener` immediately, evaluating every tick
    pub fn start_now(
        &mut self,
        clock: &mut dyn TickSource,
        listener: ListenerHandle,
    ) -> Result<(), ClockError> {
        self.start(clock, listener, 0, 1)
    }

    /// Start playing to `listener` after `delay_ticks`, then evaluate the
    /// song once every `period_ticks`.
    ///
    /// Each evaluation advances the song position by one tick, so a period
    /// above 1 slows the song down. A running playback is restarted. The
    /// clock subscription is cancelled once the last note has fired.
    pub fn start(
        &mut self,
        clock: &mut dyn TickSource,
        listener: ListenerHandle,
        delay_ticks: u64,
        period_ticks: u64,
    ) -> Result<(), ClockError> {
        self.stop();

        let song = Arc::clone(&self.song);
        let state = Arc::clone(&self.state);
        Self::lock(&state).playing = true;

        let handle = clock.schedule(
            delay_ticks,
            period_ticks,
            Box::new(move || {
                let mut state = Self::lock(&state);
                if !state.playing {
                    return;
                }
                for note in song.notes() {
                    if note.start_tick() == state.current_tick {
                        emit_play(listener.as_ref(), note, note.category());
                    }
                }
                state.current_tick += 1;
                if state.current_tick > song.max_end_tick() {
                    state.playing = false;
                    state.cancel();
                }
            }),
        );

        match handle {
            Ok(handle) => {
                debug!(title = self.song.title(), delay_ticks, period_ticks, "solo playback started");
                let mut state = Self::lock(&self.state);
                if state.playing {
                    state.subscription = Some(handle);
                } else {
                    // Already ran to the end before the handle came back
                    handle.cancel();
                }
                Ok(())
            }
            Err(e) => {
                Self::lock(&self.state).playing = false;
                Err(e)
            }
        }
    }

    /// Stop playback and rewind to the beginning
    pub fn stop(&mut self) {
        let mut state = Self::lock(&self.state);
        state.cancel();
        state.playing = false;
        state.current_tick = 0;
    }

    /// Check if notes are still being fired
    pub fn is_playing(&self) -> bool {
        Self::lock(&self.state).playing
    }

    /// Song position of the next evaluation
    pub fn current_tick(&self) -> u32 {
        Self::lock(&self.state).current_tick
    }
}

impl Drop for SoloPlayer {
    fn drop(&mut self) {
        Self::lock(&self.state).cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;
    use crate::song::{Category, Note, Sound};
    use crate::timing::ManualClock;

    fn song() -> Arc<Song> {
        Arc::new(
            Song::new("jingle", 120)
                .with_note(Note::new(Sound::Harp, Category::Music, 0, 3, 1.0, 1.0).unwrap())
                .with_note(Note::instant(Sound::Bell, 2, 1.0, 1.0).unwrap()),
        )
    }

    #[test]
    fn test_plays_starts_only() {
        let mut clock = ManualClock::new();
        let rec = Arc::new(RecordingListener::new("solo"));
        let mut player = SoloPlayer::new(song());
        player.start_now(&mut clock, rec.clone()).unwrap();

        clock.advance(10);
        assert_eq!(rec.play_count(), 2);
        assert_eq!(rec.stop_count(), 0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_finished_playback_releases_clock() {
        let mut clock = ManualClock::new();
        let rec = Arc::new(RecordingListener::new("solo"));
        let mut player = SoloPlayer::new(song());
        player.start_now(&mut clock, rec.clone()).unwrap();

        clock.advance(3);
        assert_eq!(clock.scheduled_count(), 1);
        clock.advance(1); // song tick 3 is the last one
        assert!(!player.is_playing());
        assert_eq!(clock.scheduled_count(), 0);
    }

    #[test]
    fn test_delay_and_period() {
        let mut clock = ManualClock::new();
        let rec = Arc::new(RecordingListener::new("solo"));
        let mut player = SoloPlayer::new(song());
        player.start(&mut clock, rec.clone(), 4, 2).unwrap();

        clock.advance(4);
        assert!(rec.is_empty());
        clock.advance(1); // clock tick 4, song tick 0
        assert_eq!(rec.play_count(), 1);
        clock.advance(4); // clock ticks 5..=8, song ticks 1 and 2
        assert_eq!(rec.play_count(), 2);
        assert_eq!(player.current_tick(), 3);
    }

    #[test]
    fn test_stop_rewinds_and_silences() {
        let mut clock = ManualClock::new();
        let rec = Arc::new(RecordingListener::new("solo"));
        let mut player = SoloPlayer::new(song());
        player.start_now(&mut clock, rec.clone()).unwrap();

        clock.advance(1);
        player.stop();
        assert_eq!(player.current_tick(), 0);
        assert!(!player.is_playing());

        clock.advance(5);
        assert_eq!(rec.play_count(), 1);
        assert_eq!(clock.scheduled_count(), 0);
    }

    #[test]
    fn test_zero_period_is_an_error() {
        let mut clock = ManualClock::new();
        let rec = Arc::new(RecordingListener::new("solo"));
        let mut player = SoloPlayer::new(song());
        assert_eq!(
            player.start(&mut clock, rec, 0, 0),
            Err(ClockError::ZeroPeriod)
        );
        assert!(!player.is_playing());
    }
}
