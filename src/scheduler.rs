//! Execution contexts.
//!
//! A [`Scheduler`] decides where and when a unit of work runs. Every
//! scheduled task gets a [`TaskHandle`]; cancelling the handle before the
//! executing context reaches the task swallows the task entirely. The
//! cancellation flag is checked immediately before the task body runs, which
//! is what makes "dispose swallows the pending element" hold for `delay`,
//! `observe_on` and timer sources.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use crate::subscription::{Subscription, SubscriptionLike};

mod event_loop;
mod pool;
mod virtual_scheduler;

pub use event_loop::EventLoopScheduler;
pub use pool::PoolScheduler;
pub use virtual_scheduler::VirtualScheduler;

pub type Task = Box<dyn FnOnce() + Send>;

/// Cancellation handle for one scheduled task.
///
/// Closes itself once the task has run, so composites holding many handles
/// (interval consumers) can prune them.
#[derive(Clone, Default)]
pub struct TaskHandle {
  cancelled: Arc<AtomicBool>,
  finished: Arc<AtomicBool>,
}

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  /// Called by the executing context right before running the task body.
  /// Returns `false` when the task was cancelled and must be skipped.
  pub fn begin(&self) -> bool { !self.cancelled.load(Ordering::Acquire) }

  /// Called by the executing context after the task body returned.
  pub fn finish(&self) { self.finished.store(true, Ordering::Release); }

  pub fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&mut self) { self.cancelled.store(true, Ordering::Release); }

  fn is_closed(&self) -> bool {
    self.cancelled.load(Ordering::Acquire) || self.finished.load(Ordering::Acquire)
  }
}

/// Where and when work runs.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Run `task` as soon as this scheduler's policy allows.
  fn schedule(&self, task: Task) -> TaskHandle;

  /// Run `task` after at least `delay`.
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle;

  /// Repeatedly run `task` until it returns `None`; each `Some(delay)` waits
  /// `delay` before the next round. The loop lives in scheduled tasks, never
  /// on the caller's stack, so unbounded repetition is stack-safe.
  fn schedule_recursive<F>(&self, task: F) -> Subscription
  where
    F: FnMut() -> Option<Duration> + Send + 'static,
  {
    let handle = Subscription::new();
    schedule_round(self, &handle, Arc::new(std::sync::Mutex::new(task)), Duration::ZERO);
    handle
  }
}

fn schedule_round<S, F>(
  scheduler: &S,
  handle: &Subscription,
  task: Arc<std::sync::Mutex<F>>,
  delay: Duration,
) where
  S: Scheduler,
  F: FnMut() -> Option<Duration> + Send + 'static,
{
  let scheduler2 = scheduler.clone();
  let h = handle.clone();
  let task_handle = scheduler.schedule_after(
    delay,
    Box::new(move || {
      // Drain zero-delay rounds inline; only a real delay reschedules.
      loop {
        if h.is_closed() {
          return;
        }
        let next = (&mut *task.lock().unwrap())();
        match next {
          None => return,
          Some(d) if d.is_zero() => continue,
          Some(d) => {
            schedule_round(&scheduler2, &h, task, d);
            return;
          }
        }
      }
    }),
  );
  handle.add(task_handle);
}

/// Runs tasks synchronously on the caller's thread. Delays block the caller.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    if handle.begin() {
      task();
      handle.finish();
    }
    handle
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    if !delay.is_zero() {
      thread::sleep(delay);
    }
    self.schedule(task)
  }
}

/// Spawns a fresh thread per task.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    self.schedule_after(Duration::ZERO, task)
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let h = handle.clone();
    thread::spawn(move || {
      if !delay.is_zero() {
        thread::sleep(delay);
      }
      if h.begin() {
        task();
        h.finish();
      }
    });
    handle
  }
}
