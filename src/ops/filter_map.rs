use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

/// `map` and `filter` in one pass: `None` drops the element.
pub struct FilterMapOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> FilterMapOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self {
    Self { source, f: Arc::new(f) }
  }
}

struct FilterMapObserver<O, F> {
  observer: O,
  f: Arc<F>,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for FilterMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: Fn(Item) -> Option<B>,
{
  fn next(&mut self, value: Item) {
    if let Some(mapped) = (*self.f)(value) {
      self.observer.next(mapped);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S, B, F> Observable for FilterMapOp<S, F>
where
  S: Observable,
  B: Send + 'static,
  F: Fn(S::Item) -> Option<B> + Send + Sync + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<B, S::Err>) -> Subscription {
    self
      .source
      .subscribe_core(Box::new(FilterMapObserver { observer, f: self.f.clone() }))
  }
}
