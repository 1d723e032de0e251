use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

/// `map` with a fallible selector: an `Err` return terminates the
/// subscription with that error, which is how user code surfaces failures
/// into the stream.
pub struct TryMapOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> TryMapOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self {
    Self { source, f: Arc::new(f) }
  }
}

struct TryMapObserver<O, F> {
  observer: O,
  f: Arc<F>,
  stopped: bool,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for TryMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: Fn(Item) -> Result<B, Err>,
{
  fn next(&mut self, value: Item) {
    if self.stopped {
      return;
    }
    match (*self.f)(value) {
      Ok(mapped) => self.observer.next(mapped),
      Err(err) => {
        self.stopped = true;
        self.observer.error(err);
      }
    }
  }

  fn error(&mut self, err: Err) {
    if !self.stopped {
      self.stopped = true;
      self.observer.error(err);
    }
  }

  fn complete(&mut self) {
    if !self.stopped {
      self.stopped = true;
      self.observer.complete();
    }
  }

  fn is_stopped(&self) -> bool { self.stopped || self.observer.is_stopped() }
}

impl<S, B, F> Observable for TryMapOp<S, F>
where
  S: Observable,
  B: Send + 'static,
  F: Fn(S::Item) -> Result<B, S::Err> + Send + Sync + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<B, S::Err>) -> Subscription {
    self.source.subscribe_core(Box::new(TryMapObserver {
      observer,
      f: self.f.clone(),
      stopped: false,
    }))
  }
}
