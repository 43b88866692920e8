//! Abstraction for the host-provided periodic scheduling primitive.
//!
//! A [CountdownTimer][crate::countdown::CountdownTimer] does not keep time by
//! itself. It registers a repeating action with a [PeriodicScheduler] and owns
//! the returned handle for as long as the registration should stay alive. The
//! [ThreadScheduler] drives registrations with one thread each, while the
//! [mock::MockScheduler] lets tests fire registrations deterministically.
use core::fmt::Debug;
use core::time::Duration;

#[cfg(feature = "std")]
pub use std_mod::*;

/// Returned by a scheduled action on each fire to signal whether the
/// registration should stay alive.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum OpResult {
    Continue,
    TerminationRequested,
}

/// Repeating action fired by a [PeriodicScheduler] once per interval.
pub type PeriodicAction = alloc::boxed::Box<dyn FnMut() -> OpResult + Send>;

/// Generic trait for the repeating-callback primitive of the host environment.
///
/// [Self::register] arms a repeating action which fires every `interval` until
/// it is cancelled or requests its own termination by returning
/// [OpResult::TerminationRequested]. The returned handle is the exclusively
/// owned proof of the registration. [Self::cancel] consumes the handle and
/// must tolerate registrations which have already terminated themselves.
pub trait PeriodicScheduler {
    type Handle;
    type Error: Debug;

    fn register(
        &mut self,
        action: PeriodicAction,
        interval: Duration,
    ) -> Result<Self::Handle, Self::Error>;

    fn cancel(&mut self, handle: Self::Handle);
}

#[cfg(feature = "std")]
pub mod std_mod {
    use super::*;
    use std::io;
    use std::string::String;
    use std::sync::mpsc::{self, TryRecvError};
    use std::thread::{self, JoinHandle};

    /// Handle to a registration driven by a [ThreadScheduler] thread.
    ///
    /// Dropping the handle disconnects the termination channel, which stops
    /// the thread after its current interval sleep.
    #[derive(Debug)]
    pub struct ThreadHandle {
        termination: mpsc::Sender<()>,
        _join_handle: JoinHandle<()>,
    }

    /// [PeriodicScheduler] backed by one named thread per registration.
    ///
    /// Each registration thread sleeps for one interval, polls for
    /// termination and then fires the action, so the first fire happens one
    /// interval after [PeriodicScheduler::register].
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ThreadScheduler;

    impl PeriodicScheduler for ThreadScheduler {
        type Handle = ThreadHandle;
        type Error = io::Error;

        fn register(
            &mut self,
            mut action: PeriodicAction,
            interval: Duration,
        ) -> Result<ThreadHandle, io::Error> {
            let (termination, termination_rx) = mpsc::channel();
            let join_handle = thread::Builder::new()
                .name(String::from("periodic-sched"))
                .spawn(move || loop {
                    thread::sleep(interval);
                    match termination_rx.try_recv() {
                        Ok(_) | Err(TryRecvError::Disconnected) => {
                            return;
                        }
                        Err(TryRecvError::Empty) => (),
                    }
                    if action() == OpResult::TerminationRequested {
                        return;
                    }
                })?;
            Ok(ThreadHandle {
                termination,
                _join_handle: join_handle,
            })
        }

        fn cancel(&mut self, handle: ThreadHandle) {
            // A send error means the registration already terminated itself.
            handle.termination.send(()).ok();
        }
    }
}

#[cfg(any(test, feature = "test_util"))]
pub mod mock {
    use super::*;
    use core::convert::Infallible;
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    struct MockRegistration {
        action: PeriodicAction,
        interval: Duration,
    }

    #[derive(Default)]
    struct MockSchedulerInner {
        registrations: Vec<Option<MockRegistration>>,
    }

    /// Deterministic [PeriodicScheduler] for tests.
    ///
    /// Registrations never fire on their own, only when [Self::fire_all] is
    /// called. Clones share the same registration table, so a test can keep
    /// one clone for driving fires while the timer owns the other.
    #[derive(Clone, Default)]
    pub struct MockScheduler {
        inner: Arc<Mutex<MockSchedulerInner>>,
    }

    impl MockScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of registrations which are still alive.
        pub fn active_registrations(&self) -> usize {
            self.inner
                .lock()
                .unwrap()
                .registrations
                .iter()
                .filter(|reg| reg.is_some())
                .count()
        }

        /// Intervals of all live registrations, in registration order.
        pub fn live_intervals(&self) -> Vec<Duration> {
            self.inner
                .lock()
                .unwrap()
                .registrations
                .iter()
                .filter_map(|reg| reg.as_ref().map(|reg| reg.interval))
                .collect()
        }

        /// Fire every live registration once, dropping those that request
        /// their own termination.
        pub fn fire_all(&self) {
            let mut inner = self.inner.lock().unwrap();
            for slot in inner.registrations.iter_mut() {
                if let Some(registration) = slot {
                    if (registration.action)() == OpResult::TerminationRequested {
                        *slot = None;
                    }
                }
            }
        }

        /// [Self::fire_all] repeated `n` times.
        pub fn fire_n(&self, n: usize) {
            for _ in 0..n {
                self.fire_all();
            }
        }
    }

    impl PeriodicScheduler for MockScheduler {
        type Handle = usize;
        type Error = Infallible;

        fn register(
            &mut self,
            action: PeriodicAction,
            interval: Duration,
        ) -> Result<usize, Infallible> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .registrations
                .push(Some(MockRegistration { action, interval }));
            Ok(inner.registrations.len() - 1)
        }

        fn cancel(&mut self, handle: usize) {
            let mut inner = self.inner.lock().unwrap();
            if let Some(slot) = inner.registrations.get_mut(handle) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockScheduler;
    use super::*;
    use alloc::boxed::Box;
    use std::sync::mpsc;

    #[test]
    fn mock_fires_registered_action() {
        let mut sched = MockScheduler::new();
        let (tx, rx) = mpsc::channel();
        let handle = sched
            .register(
                Box::new(move || {
                    tx.send(()).unwrap();
                    OpResult::Continue
                }),
                Duration::from_millis(100),
            )
            .unwrap();
        assert_eq!(sched.active_registrations(), 1);
        assert_eq!(sched.live_intervals(), [Duration::from_millis(100)]);
        sched.fire_n(3);
        assert_eq!(rx.try_iter().count(), 3);
        sched.cancel(handle);
        assert_eq!(sched.active_registrations(), 0);
        sched.fire_all();
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn mock_drops_self_terminating_action() {
        let mut sched = MockScheduler::new();
        let mut fires = 0;
        let (tx, rx) = mpsc::channel();
        sched
            .register(
                Box::new(move || {
                    fires += 1;
                    tx.send(fires).unwrap();
                    if fires == 2 {
                        return OpResult::TerminationRequested;
                    }
                    OpResult::Continue
                }),
                Duration::from_millis(100),
            )
            .unwrap();
        sched.fire_n(4);
        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(sched.active_registrations(), 0);
    }

    #[test]
    fn cancel_of_terminated_registration_is_noop() {
        let mut sched = MockScheduler::new();
        let handle = sched
            .register(
                Box::new(|| OpResult::TerminationRequested),
                Duration::from_millis(100),
            )
            .unwrap();
        sched.fire_all();
        assert_eq!(sched.active_registrations(), 0);
        sched.cancel(handle);
        assert_eq!(sched.active_registrations(), 0);
    }
}
