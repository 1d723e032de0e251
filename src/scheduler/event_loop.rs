//! Serial scheduler backed by a dedicated worker thread.

use std::{
  collections::BinaryHeap,
  sync::{Arc, Condvar, Mutex, Weak},
  thread,
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskHandle};

struct Entry {
  due: Instant,
  seq: u64,
  task: Task,
  handle: TaskHandle,
}

// Min-heap on (due, seq): earliest deadline first, FIFO for equal deadlines.
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
  queue: Mutex<(BinaryHeap<Entry>, u64)>,
  available: Condvar,
}

/// Runs all tasks on one worker thread in due-time order; tasks with the same
/// due time run in submission order. Destinations handed to `observe_on` use
/// this to preserve element ordering off the producing thread.
///
/// The worker shuts down when the last clone of the scheduler is dropped.
#[derive(Clone)]
pub struct EventLoopScheduler {
  core: Arc<Core>,
}

impl Default for EventLoopScheduler {
  fn default() -> Self { Self::new() }
}

impl EventLoopScheduler {
  pub fn new() -> Self {
    let core = Arc::new(Core {
      queue: Mutex::new((BinaryHeap::new(), 0)),
      available: Condvar::new(),
    });
    let weak = Arc::downgrade(&core);
    thread::Builder::new()
      .name("rivulet-event-loop".into())
      .spawn(move || worker(weak))
      .expect("failed to spawn event loop thread");
    Self { core }
  }
}

fn worker(core: Weak<Core>) {
  loop {
    // Upgrade per wakeup so the worker notices when every scheduler clone
    // is gone and exits, even while a far-future entry tops the queue.
    let Some(core) = core.upgrade() else { return };
    let task = {
      let mut queue = core.queue.lock().unwrap();
      let now = Instant::now();
      // Bounded waits so the upgrade check above runs even when idle or
      // while the head entry is far in the future.
      let wait = match queue.0.peek() {
        Some(entry) if entry.due <= now => None,
        Some(entry) => Some((entry.due - now).min(Duration::from_millis(250))),
        None => Some(Duration::from_millis(250)),
      };
      match wait {
        None => Some(queue.0.pop().unwrap()),
        Some(wait) => {
          drop(core.available.wait_timeout(queue, wait).unwrap());
          None
        }
      }
    };
    if let Some(entry) = task {
      if entry.handle.begin() {
        (entry.task)();
        entry.handle.finish();
      }
    }
  }
}

impl Scheduler for EventLoopScheduler {
  fn schedule(&self, task: Task) -> TaskHandle {
    self.schedule_after(Duration::ZERO, task)
  }

  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    {
      let mut queue = self.core.queue.lock().unwrap();
      let seq = queue.1;
      queue.1 += 1;
      queue.0.push(Entry {
        due: Instant::now() + delay,
        seq,
        task,
        handle: handle.clone(),
      });
    }
    self.core.available.notify_one();
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;

  #[test]
  fn runs_in_submission_order() {
    let scheduler = EventLoopScheduler::new();
    let (tx, rx) = mpsc::channel();
    for i in 0..5 {
      let tx = tx.clone();
      scheduler.schedule(Box::new(move || tx.send(i).unwrap()));
    }
    let seen: Vec<i32> = (0..5)
      .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
      .collect();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn worker_exits_while_a_far_future_entry_is_queued() {
    use std::sync::atomic::{AtomicBool, Ordering};

    // Dropping the queue entry drops the task's captures, so a drop flag
    // observes the worker thread releasing the core and exiting.
    struct DropFlag(Arc<AtomicBool>);
    impl Drop for DropFlag {
      fn drop(&mut self) { self.0.store(true, Ordering::SeqCst); }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let scheduler = EventLoopScheduler::new();
    let flag = DropFlag(dropped.clone());
    scheduler.schedule_after(
      Duration::from_secs(3600),
      Box::new(move || {
        let _ = &flag;
      }),
    );
    drop(scheduler);

    let deadline = Instant::now() + Duration::from_secs(2);
    while !dropped.load(Ordering::SeqCst) && Instant::now() < deadline {
      thread::sleep(Duration::from_millis(10));
    }
    assert!(dropped.load(Ordering::SeqCst));
  }

  #[test]
  fn delayed_task_runs_after_eager_one() {
    let scheduler = EventLoopScheduler::new();
    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    scheduler.schedule_after(Duration::from_millis(40), Box::new(move || {
      tx2.send("late").unwrap()
    }));
    scheduler.schedule(Box::new(move || tx.send("eager").unwrap()));

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "eager");
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "late");
  }
}
