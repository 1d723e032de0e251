//! # rivulet: composable push-based event streams
//!
//! A stream is an immutable recipe; subscribing runs it for one independent
//! subscription and returns a [`Subscription`] that cancels it. Events flow
//! push-style as any number of `next` values terminated by at most one
//! `error` or `complete`.
//!
//! ## Quick Start
//!
//! ```rust
//! use rivulet::prelude::*;
//!
//! observable::from_iter::<_, ()>(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("value: {v}"));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | The core trait defining stream operations |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Scheduler`] | Where and when scheduled work runs |
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler

pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod single;
mod sink;
pub mod subject;
pub mod subscription;
pub mod testing;

pub use prelude::*;
