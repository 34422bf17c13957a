// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Multi-channel playback engine.
//!
//! The engine owns the channel registry and one clock subscription that
//! ticks every channel on each fire. The registry sits behind a mutex
//! shared with the clock task, so control calls made from other threads
//! are serialized with the tick fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::listener::{ListenerHandle, ListenerId};
use crate::playback::{Channel, PlaybackPolicy};
use crate::song::{Category, InstrumentRef, Song};
use crate::timing::{ClockError, ClockHandle, TickSource};

#[derive(Debug)]
struct Registry {
    channels: HashMap<String, Channel>,
    subscription: Option<ClockHandle>,
    release_when_idle: bool,
}

impl Registry {
    fn new(release_when_idle: bool) -> Self {
        Self {
            channels: HashMap::new(),
            subscription: None,
            release_when_idle,
        }
    }

    /// Tick every channel, then drop the ones left without listeners or songs
    fn tick(&mut self) {
        for channel in self.channels.values_mut() {
            channel.tick();
        }
        self.channels.retain(|name, channel| {
            let keep = !channel.is_idle();
            if !keep {
                debug!(channel = %name, "idle channel dropped");
            }
            keep
        });
        self.release_clock_if_idle();
    }

    fn channel_mut(&mut self, name: &str, policy: PlaybackPolicy) -> &mut Channel {
        self.channels.entry(name.to_string()).or_insert_with(|| {
            debug!(channel = name, "channel created");
            Channel::with_policy(name, policy)
        })
    }

    fn is_clock_running(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|handle| !handle.is_cancelled())
    }

    fn cancel_clock(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.cancel();
        }
    }

    fn release_clock_if_idle(&mut self) {
        if self.release_when_idle && self.channels.is_empty() && self.subscription.is_some() {
            self.cancel_clock();
            debug!("engine clock released");
        }
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| {
        warn!("engine registry lock poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Registry of channels driven by one fixed-rate clock
pub struct Engine {
    registry: Arc<Mutex<Registry>>,
    clock: Box<dyn TickSource>,
    config: EngineConfig,
    policy: PlaybackPolicy,
}

impl Engine {
    /// Create an engine and start its clock subscription
    pub fn new(config: EngineConfig, clock: impl TickSource + 'static) -> Result<Self, ClockError> {
        if config.period_ticks == 0 {
            return Err(ClockError::ZeroPeriod);
        }

        let policy = config.policy();
        let mut engine = Self {
            registry: Arc::new(Mutex::new(Registry::new(config.release_clock_when_idle))),
            clock: Box::new(clock),
            config,
            policy,
        };
        engine.arm_clock()?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn arm_clock(&mut self) -> Result<(), ClockError> {
        if self.is_clock_running() {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let handle = self.clock.schedule(
            self.config.start_delay_ticks,
            self.config.period_ticks,
            Box::new(move || lock_registry(&registry).tick()),
        )?;
        debug!(
            delay = self.config.start_delay_ticks,
            period = self.config.period_ticks,
            "engine clock armed"
        );
        lock_registry(&self.registry).subscription = Some(handle);
        Ok(())
    }

    fn ensure_clock(&mut self) {
        if let Err(e) = self.arm_clock() {
            warn!(error = %e, "failed to re-arm engine clock");
        }
    }

    /// Check if the clock subscription is live
    pub fn is_clock_running(&self) -> bool {
        lock_registry(&self.registry).is_clock_running()
    }

    /// Advance every channel by one tick.
    ///
    /// The clock subscription calls this on every fire; hosts driving the
    /// engine themselves may call it directly. Channels left with neither
    /// listeners nor songs are dropped afterwards.
    pub fn tick(&self) {
        lock_registry(&self.registry).tick();
    }

    /// Make sure a channel exists, re-arming the clock if it was released
    ///
    /// # Returns
    /// `true` if the channel was created by this call
    pub fn create_or_get_channel(&mut self, name: &str) -> bool {
        let created = {
            let mut registry = lock_registry(&self.registry);
            let created = !registry.channels.contains_key(name);
            registry.channel_mut(name, self.policy);
            created
        };
        self.ensure_clock();
        created
    }

    /// Remove a channel, detaching every listener with full stop cleanup
    pub fn remove_channel(&mut self, name: &str) {
        let mut registry = lock_registry(&self.registry);
        if let Some(mut channel) = registry.channels.remove(name) {
            channel.detach_all_listeners();
            debug!(channel = name, "channel removed");
        }
        registry.release_clock_if_idle();
    }

    /// Add a listener to a channel, creating the channel if needed
    pub fn add_listener(&mut self, channel: &str, listener: ListenerHandle) {
        lock_registry(&self.registry)
            .channel_mut(channel, self.policy)
            .add_listener(listener);
        self.ensure_clock();
    }

    /// Remove a listener from one channel.
    ///
    /// A channel left with neither listeners nor songs is dropped.
    pub fn remove_listener(&mut self, channel: &str, listener: &ListenerId) {
        let mut registry = lock_registry(&self.registry);
        let Some(ch) = registry.channels.get_mut(channel) else {
            return;
        };
        ch.remove_listener(listener);
        if ch.is_idle() {
            registry.channels.remove(channel);
            debug!(channel, "idle channel dropped");
        }
        registry.release_clock_if_idle();
    }

    /// Remove a listener from every channel it belongs to.
    ///
    /// Every catalog sound used in a channel is stopped in the default
    /// category for that listener before the usual per-note cleanup.
    /// Channels the listener leaves empty are dropped.
    pub fn remove_listener_from_all_channels(&mut self, listener: &ListenerId) {
        let mut registry = lock_registry(&self.registry);
        registry.channels.retain(|name, channel| {
            let Some(handle) = channel.listener(listener).cloned() else {
                return true;
            };
            for sound in channel.played_sounds() {
                handle.stop(&InstrumentRef::Sound(sound), Category::DEFAULT);
            }
            channel.remove_listener(listener);

            let keep = channel.listener_count() > 0;
            if !keep {
                debug!(channel = %name, "channel left without listeners dropped");
            }
            keep
        });
        registry.release_clock_if_idle();
    }

    /// Start a song in a channel, creating the channel if needed
    ///
    /// # Returns
    /// The instance id (generated when `id` is empty or missing)
    pub fn play_song(
        &mut self,
        channel: &str,
        song: impl Into<Arc<Song>>,
        looping: bool,
        id: Option<&str>,
    ) -> String {
        let id = lock_registry(&self.registry)
            .channel_mut(channel, self.policy)
            .play_song(song.into(), looping, id);
        self.ensure_clock();
        id
    }

    /// Request a song stop; unknown channels and ids are ignored.
    ///
    /// A channel without listeners is dropped once the stopped song has
    /// been cleared on the next tick.
    pub fn stop_song(&mut self, channel: &str, id: &str) {
        if let Some(ch) = lock_registry(&self.registry).channels.get_mut(channel) {
            ch.stop_song(id);
        }
    }

    /// Cancel the clock and drop every channel.
    ///
    /// No stop events are sent; call `remove_listener_from_all_channels`
    /// first for a clean audio teardown.
    pub fn shutdown(&mut self) {
        let mut registry = lock_registry(&self.registry);
        registry.cancel_clock();
        registry.channels.clear();
        debug!("engine shut down");
    }

    /// Names of every registered channel, sorted
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock_registry(&self.registry)
            .channels
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn has_channel(&self, name: &str) -> bool {
        lock_registry(&self.registry).channels.contains_key(name)
    }

    pub fn channel_count(&self) -> usize {
        lock_registry(&self.registry).channels.len()
    }

    /// Inspect a channel while the registry is locked
    pub fn with_channel<R>(&self, name: &str, f: impl FnOnce(&Channel) -> R) -> Option<R> {
        lock_registry(&self.registry).channels.get(name).map(f)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        lock_registry(&self.registry).cancel_clock();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("channels", &self.channel_names())
            .field("clock_running", &self.is_clock_running())
            .field("config", &self.config)
            .finish()
    }
}
