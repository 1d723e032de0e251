use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::subscription::Subscription;

pub struct DeferObservable<F> {
  factory: F,
}

/// Build a fresh source per subscription. The factory runs at subscribe
/// time, so each subscriber observes the state of the world at its own
/// subscription, not at assembly.
pub fn defer<S, F>(factory: F) -> DeferObservable<F>
where
  S: Observable,
  F: Fn() -> S + Send + Sync + 'static,
{
  DeferObservable { factory }
}

impl<S, F> Observable for DeferObservable<F>
where
  S: Observable,
  F: Fn() -> S + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    (self.factory)().subscribe_core(observer)
  }
}
