// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the fixed-rate tick sources that drive the
//! playback engine.

pub mod clock;

pub use clock::{
    ClockError, ClockHandle, ManualClock, TickRate, TickSource, TickTask, TokioClock,
    DEFAULT_TICKS_PER_SECOND,
};
