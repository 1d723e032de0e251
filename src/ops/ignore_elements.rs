use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

/// Forwards only the terminal event.
pub struct IgnoreElementsOp<S> {
  source: S,
}

impl<S> IgnoreElementsOp<S> {
  pub(crate) fn new(source: S) -> Self { Self { source } }
}

struct IgnoreObserver<O> {
  observer: O,
}

impl<Item, Err, O> Observer<Item, Err> for IgnoreObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, _value: Item) {}

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S> Observable for IgnoreElementsOp<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    self.source.subscribe_core(Box::new(IgnoreObserver { observer }))
  }
}
