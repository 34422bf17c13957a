// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording listener for testing and offline inspection.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Listener, ListenerId, SoundEvent};
use crate::song::{Category, InstrumentRef};

/// Listener that records every event it receives
#[derive(Debug)]
pub struct RecordingListener {
    id: ListenerId,
    events: Mutex<Vec<SoundEvent>>,
}

impl RecordingListener {
    pub fn new(id: impl Into<ListenerId>) -> Self {
        Self {
            id: id.into(),
            events: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SoundEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of every event recorded so far
    pub fn events(&self) -> Vec<SoundEvent> {
        self.lock().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<SoundEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of play events recorded
    pub fn play_count(&self) -> usize {
        self.lock().iter().filter(|e| e.is_play()).count()
    }

    /// Number of stop events recorded
    pub fn stop_count(&self) -> usize {
        self.lock().iter().filter(|e| e.is_stop()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Listener for RecordingListener {
    fn id(&self) -> &ListenerId {
        &self.id
    }

    fn play(&self, instrument: &InstrumentRef, category: Category, volume: f32, pitch: f32) {
        self.lock().push(SoundEvent::Play {
            instrument: instrument.clone(),
            category,
            volume,
            pitch,
        });
    }

    fn stop(&self, instrument: &InstrumentRef, category: Category) {
        self.lock().push(SoundEvent::Stop {
            instrument: instrument.clone(),
            category,
        });
    }
}
