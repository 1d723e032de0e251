//! Logical-clock scheduler for deterministic tests.

use std::{
  collections::BinaryHeap,
  sync::{Arc, Mutex},
  time::Duration,
};

use super::{Scheduler, Task, TaskHandle};

struct Entry {
  due: Duration,
  seq: u64,
  task: Task,
  handle: TaskHandle,
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    (other.due, other.seq).cmp(&(self.due, self.seq))
  }
}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Entry {}

struct Core {
  now: Duration,
  seq: u64,
  queue: BinaryHeap<Entry>,
}

/// A scheduler whose clock only moves when told to.
///
/// Tasks run in (due time, submission order). Nothing runs until the caller
/// advances the clock, so time-dependent behavior can be asserted exactly.
/// Tasks scheduled while the clock advances (a timer re-arming itself) are
/// honored within the same advance when they fall inside it.
#[derive(Clone)]
pub struct VirtualScheduler {
  core: Arc<Mutex<Core>>,
}

impl Default for VirtualScheduler {
  fn default() -> Self { Self::new() }
}

impl VirtualScheduler {
  pub fn new() -> Self {
    Self {
      core: Arc::new(Mutex::new(Core {
        now: Duration::ZERO,
        seq: 0,
        queue: BinaryHeap::new(),
      })),
    }
  }

  /// The current logical time.
  pub fn now(&self) -> Duration { self.core.lock().unwrap().now }

  /// Move the clock forward by `delta`, running every task due on the way.
  pub fn advance_by(&self, delta: Duration) {
    let target = self.core.lock().unwrap().now + delta;
    self.advance_to(target);
  }

  /// Move the clock to `target`, running every task due on the way.
  /// A target behind the current time is a no-op.
  pub fn advance_to(&self, target: Duration) {
    loop {
      let entry = {
        let mut core = self.core.lock().unwrap();
        match core.queue.peek() {
          Some(next) if next.due <= target => {
            let entry = core.queue.pop().unwrap();
            // Clock jumps to the task's due time before the task runs, so
            // work it schedules observes the right now().
            core.now = core.now.max(entry.due);
            entry
          }
          _ => {
            core.now = core.now.max(target);
            return;
          }
        }
      };
      // Run outside the lock; tasks reschedule through this same scheduler.
      if entry.handle.begin() {
        (entry.task)();
        entry.handle.finish();
      }
    }
  }

  /// Run every queued task regardless of due time.
  pub fn drain(&self) {
    loop {
      let due = match self.core.lock().unwrap().queue.peek() {
        Some(entry) => entry.due,
        None => return,
      };
      self.advance_to(due);
    }
  }
}

impl Scheduler for VirtualScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    self.schedule_after(Duration::ZERO, task)
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut core = self.core.lock().unwrap();
    let due = core.now + delay;
    let seq = core.seq;
    core.seq += 1;
    core.queue.push(Entry { due, seq, task, handle: handle.clone() });
    handle
  }
}
