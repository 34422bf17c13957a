// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fixed-rate tick sources.
//!
//! This module provides the discrete clock that drives playback: a
//! `TickSource` runs a task at a fixed period (in ticks) after an initial
//! delay, and hands back a `ClockHandle` that cancels it. Two sources are
//! provided: `TokioClock` for real-time playback and `ManualClock` for
//! deterministic stepping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Default tick rate in ticks per second
pub const DEFAULT_TICKS_PER_SECOND: u32 = 20;

/// Clock errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// A repeating task needs a period of at least one tick
    #[error("tick period must be at least one tick")]
    ZeroPeriod,
    /// No tokio runtime is available to drive the clock
    #[error("no tokio runtime available to drive the clock")]
    NoRuntime,
    /// The tick count cannot be represented as a wall-clock deadline
    #[error("{ticks} ticks is too long to schedule")]
    TooLong { ticks: u64 },
}

/// Task run on every clock fire
pub type TickTask = Box<dyn FnMut() + Send + 'static>;

/// Wall-clock rate of the discrete tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRate {
    ticks_per_second: u32,
}

impl TickRate {
    /// Create a tick rate, clamped to 1-1000 ticks per second
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second: ticks_per_second.clamp(1, 1000),
        }
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Calculate the wall-clock length of one tick
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second as f64)
    }

    /// Convert ticks to wall-clock time
    ///
    /// # Returns
    /// `None` if the result does not fit in a `Duration`
    pub fn ticks_to_duration(&self, ticks: u64) -> Option<Duration> {
        Duration::try_from_secs_f64(ticks as f64 / self.ticks_per_second as f64).ok()
    }

    /// Convert wall-clock time to whole ticks (rounded down)
    pub fn duration_to_ticks(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.ticks_per_second as f64) as u64
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}

/// Cancellation token for a scheduled task
#[derive(Debug, Clone, Default)]
pub struct ClockHandle {
    cancelled: Arc<AtomicBool>,
}

impl ClockHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the task; it will not fire again
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trait for fixed-rate repeating schedulers.
///
/// Delay and period are both expressed in ticks.
pub trait TickSource: Send {
    /// Run `task` every `period_ticks` ticks, starting after `delay_ticks`.
    ///
    /// # Returns
    /// * `Ok(ClockHandle)` that cancels the task
    /// * `Err(ClockError::ZeroPeriod)` if `period_ticks` is zero
    /// * `Err(ClockError::TooLong)` if the source cannot represent the delay or period
    fn schedule(
        &mut self,
        delay_ticks: u64,
        period_ticks: u64,
        task: TickTask,
    ) -> Result<ClockHandle, ClockError>;
}

/// Tick source backed by a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioClock {
    runtime: Handle,
    rate: TickRate,
}

impl TokioClock {
    /// Create a clock that spawns onto the given runtime
    pub fn new(runtime: Handle, rate: TickRate) -> Self {
        Self { runtime, rate }
    }

    /// Create a clock on the runtime the caller is running in
    pub fn current(rate: TickRate) -> Result<Self, ClockError> {
        let runtime = Handle::try_current().map_err(|_| ClockError::NoRuntime)?;
        Ok(Self::new(runtime, rate))
    }

    pub fn rate(&self) -> TickRate {
        self.rate
    }
}

impl TickSource for TokioClock {
    fn schedule(
        &mut self,
        delay_ticks: u64,
        period_ticks: u64,
        mut task: TickTask,
    ) -> Result<ClockHandle, ClockError> {
        if period_ticks == 0 {
            return Err(ClockError::ZeroPeriod);
        }

        let too_long = |ticks| ClockError::TooLong { ticks };
        let delay = self
            .rate
            .ticks_to_duration(delay_ticks)
            .ok_or(too_long(delay_ticks))?;
        let period = self
            .rate
            .ticks_to_duration(period_ticks)
            .ok_or(too_long(period_ticks))?;
        let start = Instant::now()
            .checked_add(delay)
            .ok_or(too_long(delay_ticks))?;
        start.checked_add(period).ok_or(too_long(period_ticks))?;

        debug!(?delay, ?period, "scheduling tokio tick task");

        let handle = ClockHandle::new();
        let token = handle.clone();
        self.runtime.spawn(async move {
            let mut interval = interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if token.is_cancelled() {
                    break;
                }
                task();
            }
            debug!("tokio tick task cancelled");
        });

        Ok(handle)
    }
}

struct ManualTask {
    next_due: u64,
    period: u64,
    task: TickTask,
    handle: ClockHandle,
}

#[derive(Default)]
struct ManualState {
    now: u64,
    tasks: Vec<ManualTask>,
}

/// Deterministic tick source advanced by hand.
///
/// Clones share one schedule, so a caller can keep a clone to drive the
/// clock while handing another to the engine.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current clock position in ticks
    pub fn now(&self) -> u64 {
        self.lock().now
    }

    /// Number of tasks still scheduled
    pub fn scheduled_count(&self) -> usize {
        self.lock()
            .tasks
            .iter()
            .filter(|t| !t.handle.is_cancelled())
            .count()
    }

    /// Advance the clock by `ticks`, firing every task that falls due.
    ///
    /// Tasks run without the schedule locked, so a task may itself
    /// schedule or cancel tasks.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            let (now, mut running) = {
                let mut state = self.lock();
                (state.now, std::mem::take(&mut state.tasks))
            };

            for entry in running.iter_mut() {
                if entry.handle.is_cancelled() || entry.next_due > now {
                    continue;
                }
                (entry.task)();
                entry.next_due = now + entry.period;
            }

            let mut state = self.lock();
            running.retain(|t| !t.handle.is_cancelled());
            running.append(&mut state.tasks);
            state.tasks = running;
            state.now += 1;
        }
    }
}

impl TickSource for ManualClock {
    fn schedule(
        &mut self,
        delay_ticks: u64,
        period_ticks: u64,
        task: TickTask,
    ) -> Result<ClockHandle, ClockError> {
        if period_ticks == 0 {
            return Err(ClockError::ZeroPeriod);
        }

        let handle = ClockHandle::new();
        let mut state = self.lock();
        let next_due = state.now + delay_ticks;
        state.tasks.push(ManualTask {
            next_due,
            period: period_ticks,
            task,
            handle: handle.clone(),
        });
        Ok(handle)
    }
}
