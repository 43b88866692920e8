//! Countdown timer component.
//!
//! The [CountdownTimer] counts a fixed duration down to zero in steps of a
//! configurable tick granularity. While time remains, every tick fires an
//! optional [TimerHook]; once the remaining time is exhausted, a separate
//! elapsed hook fires exactly once for that run and the scheduling
//! registration terminates itself.
//!
//! The timer does not keep time on its own. It registers a repeating action
//! with a [PeriodicScheduler] on [CountdownTimer::start] and owns the returned
//! handle until [CountdownTimer::stop], [CountdownTimer::reset] or drop.
//!
//! # Example
//!
//! ```
//! use core::time::Duration;
//! use tickdown::countdown::{CountdownTimer, TimerState};
//! use tickdown::scheduler::ThreadScheduler;
//!
//! let mut timer = CountdownTimer::new(ThreadScheduler, Duration::from_secs(3));
//! timer.set_elapsed_hook(|| println!("time is up"));
//! timer.start().expect("starting countdown failed");
//! assert_eq!(timer.state(), TimerState::Running);
//! timer.stop();
//! ```
use core::time::Duration;
use log::debug;
use std::boxed::Box;
use std::sync::{Arc, Mutex};

use crate::scheduler::{OpResult, PeriodicAction, PeriodicScheduler};

/// Tick granularity a freshly constructed [CountdownTimer] uses.
pub const DEFAULT_TICK_GRANULARITY: Duration = Duration::from_millis(1000);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerState {
    Idle = 0,
    Running = 1,
    Elapsed = 2,
}

/// Zero-argument hook fired by the timer on ticks and on elapse.
///
/// A blanket implementation covers all matching closures, so hooks can be
/// passed as plain `FnMut()` closures or as dedicated hook types.
pub trait TimerHook: Send {
    fn fire(&mut self);
}

impl<F: FnMut() + Send> TimerHook for F {
    fn fire(&mut self) {
        self()
    }
}

/// Generic error for invalid timer arguments.
///
/// Negative durations and non-invocable hooks are unrepresentable in this
/// API, which leaves the tick granularity as the only argument with a
/// residual runtime check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArgumentError {
    #[error("tick granularity must be non-zero")]
    ZeroTickGranularity,
}

struct TimerInner {
    initial: Duration,
    remaining: Duration,
    tick_granularity: Duration,
    state: TimerState,
    tick_hook: Option<Box<dyn TimerHook>>,
    elapsed_hook: Option<Box<dyn TimerHook>>,
}

/// Countdown timer which decrements a remaining duration once per tick.
///
/// The timer state is shared between the public API and the action registered
/// at the scheduler, so accessors and mutators remain usable while a run is
/// in progress. All operations are synchronous and return immediately; tick
/// effects happen whenever the scheduler fires the registered action.
pub struct CountdownTimer<Sched: PeriodicScheduler> {
    scheduler: Sched,
    shared: Arc<Mutex<TimerInner>>,
    active_handle: Option<Sched::Handle>,
}

impl<Sched: PeriodicScheduler> CountdownTimer<Sched> {
    /// Create a new countdown timer for the given duration.
    ///
    /// The remaining time starts out equal to `duration` and the tick
    /// granularity defaults to [DEFAULT_TICK_GRANULARITY]. The timer starts
    /// in [TimerState::Idle] with no hooks installed.
    pub fn new(scheduler: Sched, duration: Duration) -> Self {
        Self {
            scheduler,
            shared: Arc::new(Mutex::new(TimerInner {
                initial: duration,
                remaining: duration,
                tick_granularity: DEFAULT_TICK_GRANULARITY,
                state: TimerState::Idle,
                tick_hook: None,
                elapsed_hook: None,
            })),
            active_handle: None,
        }
    }

    /// Install the hook fired on every tick while time remains.
    ///
    /// Replaces a previously installed hook. Takes effect at the next fire.
    pub fn set_tick_hook(&mut self, hook: impl TimerHook + 'static) {
        self.shared.lock().unwrap().tick_hook = Some(Box::new(hook));
    }

    /// Install the hook fired exactly once per run when the timer elapses.
    ///
    /// Replaces a previously installed hook. Takes effect at the next fire.
    pub fn set_elapsed_hook(&mut self, hook: impl TimerHook + 'static) {
        self.shared.lock().unwrap().elapsed_hook = Some(Box::new(hook));
    }

    /// Start counting down.
    ///
    /// Registers a repeating action at the scheduler which fires once per
    /// tick granularity. The granularity is captured at this point: a
    /// [Self::set_tick_granularity] call during a run only affects runs
    /// started afterwards.
    ///
    /// Calling this on a timer which is already [TimerState::Running] is a
    /// guarded no-op, so a timer never owns more than one live registration.
    /// Starting an elapsed timer whose remaining time was not restored
    /// beforehand re-elapses on the first fire.
    pub fn start(&mut self) -> Result<(), Sched::Error> {
        let step;
        let prev_state;
        {
            let mut inner = self.shared.lock().unwrap();
            if inner.state == TimerState::Running {
                return Ok(());
            }
            prev_state = inner.state;
            step = inner.tick_granularity;
            inner.state = TimerState::Running;
        }
        let shared = self.shared.clone();
        let action: PeriodicAction = Box::new(move || run_tick(&shared, step));
        match self.scheduler.register(action, step) {
            Ok(handle) => {
                // A stale handle can be left over from a run which elapsed
                // and terminated its own registration.
                if let Some(stale) = self.active_handle.replace(handle) {
                    self.scheduler.cancel(stale);
                }
                debug!("countdown started with step {:?}", step);
                Ok(())
            }
            Err(e) => {
                self.shared.lock().unwrap().state = prev_state;
                Err(e)
            }
        }
    }

    /// Stop counting down without touching the remaining time.
    ///
    /// Cancels the live registration if one exists and is a no-op otherwise,
    /// so it is safe to call repeatedly and on an idle timer. A subsequent
    /// [Self::start] resumes from the preserved remaining time.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active_handle.take() {
            self.scheduler.cancel(handle);
        }
        let mut inner = self.shared.lock().unwrap();
        if inner.state == TimerState::Running {
            inner.state = TimerState::Idle;
            debug!("countdown stopped with {:?} remaining", inner.remaining);
        }
    }

    /// Restore the remaining time to the initial duration and stop ticking.
    ///
    /// Does not restart the timer.
    pub fn reset(&mut self) {
        if let Some(handle) = self.active_handle.take() {
            self.scheduler.cancel(handle);
        }
        let mut inner = self.shared.lock().unwrap();
        inner.remaining = inner.initial;
        inner.state = TimerState::Idle;
        debug!("countdown reset to {:?}", inner.initial);
    }

    /// Duration the timer was constructed with.
    pub fn initial_time(&self) -> Duration {
        self.shared.lock().unwrap().initial
    }

    /// Remaining time of the current run.
    pub fn current_time(&self) -> Duration {
        self.shared.lock().unwrap().remaining
    }

    /// Overwrite the remaining time directly.
    ///
    /// Takes effect at the next fire. Does not cancel or restart scheduling,
    /// so this can be used to extend or shorten a run in progress.
    pub fn set_current_time(&mut self, duration: Duration) {
        self.shared.lock().unwrap().remaining = duration;
    }

    pub fn tick_granularity(&self) -> Duration {
        self.shared.lock().unwrap().tick_granularity
    }

    /// Set the tick granularity used by future runs.
    ///
    /// A run which is already in progress keeps the granularity captured when
    /// it was started. Fails for a zero granularity, which would make the
    /// countdown unable to progress.
    pub fn set_tick_granularity(&mut self, duration: Duration) -> Result<(), InvalidArgumentError> {
        if duration.is_zero() {
            return Err(InvalidArgumentError::ZeroTickGranularity);
        }
        self.shared.lock().unwrap().tick_granularity = duration;
        Ok(())
    }

    pub fn state(&self) -> TimerState {
        self.shared.lock().unwrap().state
    }
}

impl<Sched: PeriodicScheduler> Drop for CountdownTimer<Sched> {
    fn drop(&mut self) {
        if let Some(handle) = self.active_handle.take() {
            self.scheduler.cancel(handle);
        }
    }
}

fn run_tick(shared: &Arc<Mutex<TimerInner>>, step: Duration) -> OpResult {
    let mut inner = shared.lock().unwrap();
    if inner.remaining > Duration::ZERO {
        inner.remaining = inner.remaining.saturating_sub(step);
        if let Some(hook) = inner.tick_hook.as_mut() {
            hook.fire();
        }
        OpResult::Continue
    } else {
        inner.state = TimerState::Elapsed;
        debug!("countdown elapsed");
        if let Some(hook) = inner.elapsed_hook.as_mut() {
            hook.fire();
        }
        OpResult::TerminationRequested
    }
}
