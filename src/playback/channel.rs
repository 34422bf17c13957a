// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Channels: named listener groups running many songs at once.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::{ActiveSong, PlaybackPolicy};
use crate::listener::{ListenerHandle, ListenerId};
use crate::song::{Song, Sound};

/// A named group of listeners plus the songs playing to them
pub struct Channel {
    name: String,
    listeners: BTreeMap<ListenerId, ListenerHandle>,
    songs: HashMap<String, ActiveSong>,
    policy: PlaybackPolicy,
}

impl Channel {
    /// Create an empty channel
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, PlaybackPolicy::default())
    }

    pub fn with_policy(name: impl Into<String>, policy: PlaybackPolicy) -> Self {
        Self {
            name: name.into(),
            listeners: BTreeMap::new(),
            songs: HashMap::new(),
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a listener; returns false if it was already present
    pub fn add_listener(&mut self, listener: ListenerHandle) -> bool {
        let id = listener.id().clone();
        if self.listeners.contains_key(&id) {
            return false;
        }
        debug!(channel = %self.name, listener = %id, "listener joined");
        self.listeners.insert(id, listener);
        true
    }

    /// Remove a listener, first stopping every sustained note it can hear
    pub fn remove_listener(&mut self, id: &ListenerId) -> Option<ListenerHandle> {
        let listener = self.listeners.get(id)?;
        for song in self.songs.values() {
            song.stop_for_listener(listener.as_ref());
        }
        debug!(channel = %self.name, listener = %id, "listener left");
        self.listeners.remove(id)
    }

    /// Remove every listener with the same cleanup as `remove_listener`
    pub fn detach_all_listeners(&mut self) {
        let ids: Vec<ListenerId> = self.listeners.keys().cloned().collect();
        for id in &ids {
            self.remove_listener(id);
        }
    }

    pub fn listener(&self, id: &ListenerId) -> Option<&ListenerHandle> {
        self.listeners.get(id)
    }

    pub fn has_listener(&self, id: &ListenerId) -> bool {
        self.listeners.contains_key(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Start a song in this channel.
    ///
    /// An empty or missing `id` gets a freshly generated one. A song already
    /// running under the same id is force-stopped (its final stop events go
    /// out now) and replaced.
    ///
    /// # Returns
    /// The id the new instance runs under
    pub fn play_song(&mut self, song: Arc<Song>, looping: bool, id: Option<&str>) -> String {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.generate_id(),
        };

        if let Some(mut previous) = self.songs.remove(&id) {
            debug!(channel = %self.name, %id, "replacing running song");
            previous.stop();
            let listeners = self.snapshot();
            previous.tick(&listeners);
        }

        debug!(
            channel = %self.name,
            %id,
            title = song.title(),
            looping,
            "song started"
        );
        self.songs.insert(
            id.clone(),
            ActiveSong::with_policy(id.clone(), song, looping, self.policy),
        );
        id
    }

    /// Flag a song as stopped; its stop events and removal happen on the next tick
    pub fn stop_song(&mut self, id: &str) {
        if let Some(song) = self.songs.get_mut(id) {
            debug!(channel = %self.name, %id, "song stop requested");
            song.stop();
        }
    }

    /// Advance every song by one tick and drop the ones that finished.
    ///
    /// Songs flagged stopped between ticks run their final stop pass here
    /// and are dropped in the same call.
    pub fn tick(&mut self) {
        let listeners = self.snapshot();
        let channel = &self.name;
        self.songs.retain(|id, song| {
            let active = song.tick(&listeners).is_active();
            if !active {
                debug!(%channel, %id, "song removed");
            }
            active
        });
    }

    pub fn active_song(&self, id: &str) -> Option<&ActiveSong> {
        self.songs.get(id)
    }

    pub fn song_ids(&self) -> impl Iterator<Item = &str> {
        self.songs.keys().map(String::as_str)
    }

    pub fn song_count(&self) -> usize {
        self.songs.len()
    }

    /// Check if the channel has neither listeners nor songs
    pub fn is_idle(&self) -> bool {
        self.listeners.is_empty() && self.songs.is_empty()
    }

    /// Every catalog sound referenced by a song in this channel
    pub fn played_sounds(&self) -> BTreeSet<Sound> {
        self.songs
            .values()
            .flat_map(|active| active.song().notes())
            .filter_map(|note| note.instrument().as_sound())
            .collect()
    }

    fn snapshot(&self) -> Vec<ListenerHandle> {
        self.listeners.values().cloned().collect()
    }

    fn generate_id(&self) -> String {
        loop {
            let id = format!("{:016x}", rand::random::<u64>());
            if !self.songs.contains_key(&id) {
                return id;
            }
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("songs", &self.songs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordingListener;
    use crate::song::{Category, InstrumentRef, Note};

    fn sustained_song(start: u32, end: u32) -> Arc<Song> {
        Arc::new(
            Song::new("sustained", 120)
                .with_note(Note::new(Sound::Harp, Category::Master, start, end, 1.0, 1.0).unwrap()),
        )
    }

    fn listener(id: &str) -> Arc<RecordingListener> {
        Arc::new(RecordingListener::new(id))
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut channel = Channel::new("lobby");
        let a = channel.play_song(sustained_song(0, 4), false, None);
        let b = channel.play_song(sustained_song(0, 4), false, Some(""));
        assert_ne!(a, b);
        assert_eq!(channel.song_count(), 2);
    }

    #[test]
    fn test_add_listener_twice() {
        let mut channel = Channel::new("lobby");
        let rec = listener("a");
        assert!(channel.add_listener(rec.clone()));
        assert!(!channel.add_listener(rec));
        assert_eq!(channel.listener_count(), 1);
    }

    #[test]
    fn test_stop_song_is_deferred() {
        let mut channel = Channel::new("lobby");
        let rec = listener("a");
        channel.add_listener(rec.clone());
        channel.play_song(sustained_song(0, 10), false, Some("theme"));
        channel.tick();
        assert_eq!(rec.play_count(), 1);

        channel.stop_song("theme");
        channel.stop_song("theme");
        assert_eq!(rec.stop_count(), 0);
        assert_eq!(channel.song_count(), 1);

        channel.tick();
        assert_eq!(rec.stop_count(), 1);
        assert_eq!(channel.song_count(), 0);

        channel.tick();
        assert_eq!(rec.stop_count(), 1);
    }

    #[test]
    fn test_stop_unknown_song_is_noop() {
        let mut channel = Channel::new("lobby");
        channel.stop_song("missing");
        channel.tick();
        assert!(channel.is_idle());
    }

    #[test]
    fn test_replace_stops_previous_first() {
        let mut channel = Channel::new("lobby");
        let rec = listener("a");
        channel.add_listener(rec.clone());
        channel.play_song(sustained_song(0, 10), false, Some("theme"));
        channel.tick();
        rec.clear();

        channel.play_song(sustained_song(0, 3), false, Some("theme"));
        assert_eq!(rec.events().len(), 1);
        assert!(rec.events()[0].is_stop());

        channel.tick();
        let events = rec.events();
        assert_eq!(events.len(), 2);
        assert!(events[1].is_play());
        assert_eq!(channel.song_count(), 1);
        assert_eq!(channel.active_song("theme").unwrap().current_tick(), 1);
    }

    #[test]
    fn test_remove_listener_stops_only_that_listener() {
        let mut channel = Channel::new("lobby");
        let stays = listener("stays");
        let leaves = listener("leaves");
        channel.add_listener(stays.clone());
        channel.add_listener(leaves.clone());
        channel.play_song(sustained_song(0, 10), false, Some("theme"));
        channel.tick();

        let removed = channel.remove_listener(&ListenerId::new("leaves"));
        assert!(removed.is_some());
        assert_eq!(leaves.stop_count(), 1);
        assert_eq!(stays.stop_count(), 0);
        assert_eq!(channel.active_song("theme").unwrap().playing_count(), 1);

        assert!(channel.remove_listener(&ListenerId::new("leaves")).is_none());
    }

    #[test]
    fn test_late_joiner_hears_only_future_events() {
        let mut channel = Channel::new("lobby");
        let song = Arc::new(
            Song::new("two", 120)
                .with_note(Note::instant(Sound::Bell, 0, 1.0, 1.0).unwrap())
                .with_note(Note::instant(Sound::Chime, 2, 1.0, 1.0).unwrap()),
        );
        channel.play_song(song, false, Some("s"));
        channel.tick();

        let late = listener("late");
        channel.add_listener(late.clone());
        channel.tick();
        channel.tick();
        assert_eq!(late.play_count(), 1);
        assert_eq!(late.events()[0].instrument(), &InstrumentRef::Sound(Sound::Chime));
    }

    #[test]
    fn test_finished_songs_are_removed() {
        let mut channel = Channel::new("lobby");
        channel.play_song(sustained_song(0, 2), false, Some("short"));
        channel.play_song(sustained_song(0, 2), true, Some("loop"));
        for _ in 0..3 {
            channel.tick();
        }
        let ids: Vec<&str> = channel.song_ids().collect();
        assert_eq!(ids, vec!["loop"]);
    }

    #[test]
    fn test_played_sounds() {
        let mut channel = Channel::new("lobby");
        let song = Arc::new(
            Song::new("mix", 120)
                .with_note(Note::instant(Sound::Bell, 0, 1.0, 1.0).unwrap())
                .with_note(Note::instant(InstrumentRef::named("x"), 1, 1.0, 1.0).unwrap())
                .with_note(Note::instant(Sound::Bell, 2, 1.0, 1.0).unwrap()),
        );
        channel.play_song(song, false, None);
        channel.play_song(sustained_song(0, 1), false, None);
        let sounds: Vec<Sound> = channel.played_sounds().into_iter().collect();
        assert_eq!(sounds, vec![Sound::Harp, Sound::Bell]);
    }
}
