//! # tickdown: a countdown timer building block
//!
//! This crate provides a single stateful component, the
//! [CountdownTimer][countdown::CountdownTimer]. Given a duration, it
//! periodically decrements a remaining-time counter, firing an optional hook
//! per tick and a separate hook exactly once when the duration is exhausted.
//!
//! ## Overview
//!
//!  - The [scheduler] module contains the [PeriodicScheduler][scheduler::PeriodicScheduler]
//!    seam towards the host-provided repeating-callback primitive, a
//!    thread-backed implementation for std targets and a deterministic mock
//!    for tests.
//!  - The [countdown] module contains the timer itself with its lifecycle
//!    operations and time accessors.
#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(any(feature = "alloc", test))]
extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

#[cfg(feature = "std")]
pub mod countdown;
#[cfg(feature = "alloc")]
pub mod scheduler;
