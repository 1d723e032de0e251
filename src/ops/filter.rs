use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

pub struct FilterOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> FilterOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self {
    Self { source, predicate: Arc::new(predicate) }
  }
}

struct FilterObserver<O, F> {
  observer: O,
  predicate: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (*self.predicate)(&value) {
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S, F> Observable for FilterOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    self.source.subscribe_core(Box::new(FilterObserver {
      observer,
      predicate: self.predicate.clone(),
    }))
  }
}
