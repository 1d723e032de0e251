//! Concurrent scheduler backed by `futures`' thread pool.

use std::{thread, time::Duration};

use futures::executor::ThreadPool;
use once_cell::sync::Lazy;

use super::{Scheduler, Task, TaskHandle};

static SHARED_POOL: Lazy<ThreadPool> =
  Lazy::new(|| ThreadPool::new().expect("failed to build thread pool"));

/// Dispatches tasks onto a shared [`ThreadPool`]; tasks may run concurrently
/// and in any order relative to each other.
#[derive(Clone)]
pub struct PoolScheduler {
  pool: ThreadPool,
}

impl Default for PoolScheduler {
  fn default() -> Self { Self::new() }
}

impl PoolScheduler {
  /// A scheduler over the process-shared pool.
  pub fn new() -> Self { Self { pool: SHARED_POOL.clone() } }

  pub fn with_pool(pool: ThreadPool) -> Self { Self { pool } }
}

impl Scheduler for PoolScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let h = handle.clone();
    self.pool.spawn_ok(async move {
      if h.begin() {
        task();
        h.finish();
      }
    });
    handle
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    if delay.is_zero() {
      return self.schedule(task);
    }
    let handle = TaskHandle::new();
    let h = handle.clone();
    self.pool.spawn_ok(async move {
      // The pool has no timer driver; a blocking sleep on a pool thread is
      // acceptable for the coarse delays these operators use.
      thread::sleep(delay);
      if h.begin() {
        task();
        h.finish();
      }
    });
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
    mpsc,
  };

  use super::*;

  #[test]
  fn runs_all_tasks() {
    let scheduler = PoolScheduler::new();
    let count = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    for _ in 0..8 {
      let count = count.clone();
      let tx = tx.clone();
      scheduler.schedule(Box::new(move || {
        count.fetch_add(1, Ordering::SeqCst);
        tx.send(()).unwrap();
      }));
    }
    for _ in 0..8 {
      rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 8);
  }
}
