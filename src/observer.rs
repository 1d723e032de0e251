//! The consumer side of the subscription protocol.
//!
//! An [`Observer`] receives a stream of `next` values followed by at most one
//! terminal event (`error` or `complete`). All methods take `&mut self`: a
//! terminal event does not consume the observer, because terminal delivery
//! must be possible through shared, lock-guarded fan-out paths (subjects,
//! schedulers). The at-most-one-terminal invariant is enforced by sinks, not
//! by the type system.

use crate::error::UnhandledErrorHook;

/// One event of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

/// The receiver of events for one subscription.
pub trait Observer<Item, Err> {
  /// Receive the next value.
  fn next(&mut self, value: Item);

  /// Receive the terminal error. No event may follow.
  fn error(&mut self, err: Err);

  /// Receive the terminal completion. No event may follow.
  fn complete(&mut self);

  /// `true` once this observer will not accept further events, either
  /// because a terminal event was delivered or because the subscription was
  /// disposed. Sources use this to stop emitting early.
  fn is_stopped(&self) -> bool;
}

/// The boxed observer every operator seam exchanges.
pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_stopped(&self) -> bool { (**self).is_stopped() }
}

/// Observer built from the optional callbacks handed to `subscribe*`.
///
/// Latches a stopped flag before forwarding any terminal event, so a
/// misbehaving upstream that keeps calling after terminal is silenced here
/// no matter what the rest of the chain does. When no error callback was
/// supplied, errors go to the unhandled-error hook that was current at
/// subscribe time.
pub struct CallbackObserver<Item, Err> {
  on_next: Box<dyn FnMut(Item) + Send>,
  on_error: Box<dyn FnMut(Err) + Send>,
  on_completed: Option<Box<dyn FnMut() + Send>>,
  stopped: bool,
}

impl<Item, Err> CallbackObserver<Item, Err> {
  pub fn new<N>(next: N) -> Self
  where
    N: FnMut(Item) + Send + 'static,
    Err: std::fmt::Debug,
  {
    let hook: UnhandledErrorHook = crate::error::unhandled_error_hook();
    Self {
      on_next: Box::new(next),
      on_error: Box::new(move |err: Err| hook(&err)),
      on_completed: None,

      stopped: false,
    }
  }

  pub fn with_error<N, E>(next: N, error: E) -> Self
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
  {
    Self {
      on_next: Box::new(next),
      on_error: Box::new(error),
      on_completed: None,
      stopped: false,
    }
  }

  pub fn on_completed<C>(mut self, completed: C) -> Self
  where
    C: FnMut() + Send + 'static,
  {
    self.on_completed = Some(Box::new(completed));
    self
  }
}

impl<Item, Err> Observer<Item, Err> for CallbackObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if !self.stopped {
      (self.on_next)(value);
    }
  }

  fn error(&mut self, err: Err) {
    if !self.stopped {
      self.stopped = true;
      (self.on_error)(err);
    }
  }

  fn complete(&mut self) {
    if !self.stopped {
      self.stopped = true;
      if let Some(completed) = self.on_completed.as_mut() {
        completed();
      }
    }
  }

  fn is_stopped(&self) -> bool { self.stopped }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn callback_observer_latches_terminal() {
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(AtomicUsize::new(0));
    let s = seen.clone();
    let c = completions.clone();
    let mut observer =
      CallbackObserver::<i32, &str>::with_error(move |v| s.lock().unwrap().push(v), |_| {})
        .on_completed(move || {
          c.fetch_add(1, Ordering::SeqCst);
        });

    observer.next(1);
    observer.next(2);
    observer.complete();
    observer.next(3);
    observer.complete();
    observer.error("late");

    assert_eq!(&*seen.lock().unwrap(), &[1, 2]);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn error_latches_before_forwarding() {
    let errs = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let e = errs.clone();
    let mut observer =
      CallbackObserver::<i32, &str>::with_error(|_| {}, move |err| e.lock().unwrap().push(err));

    observer.error("boom");
    observer.error("again");
    observer.next(1);

    assert_eq!(&*errs.lock().unwrap(), &["boom"]);
    assert!(observer.is_stopped());
  }
}
