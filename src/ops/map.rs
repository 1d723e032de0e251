use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

pub struct MapOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> MapOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self {
    Self { source, f: Arc::new(f) }
  }
}

impl<S, F> MapOp<S, F> {
  /// Fuse a directly chained `map` into this one: both selectors compose
  /// into a single operator stage, so the chain traverses one observer
  /// instead of two. Any operator interposed between two maps has a
  /// different type and takes the ordinary un-fused path.
  pub fn map<B1, B2, G>(
    self,
    g: G,
  ) -> MapOp<S, impl Fn(S::Item) -> B2 + Send + Sync + 'static>
  where
    S: Observable,
    B1: Send + 'static,
    B2: Send + 'static,
    F: Fn(S::Item) -> B1 + Send + Sync + 'static,
    G: Fn(B1) -> B2 + Send + Sync + 'static,
  {
    let f = self.f;
    MapOp::new(self.source, move |value| g((*f)(value)))
  }
}

struct MapObserver<O, F> {
  observer: O,
  f: Arc<F>,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: Fn(Item) -> B,
{
  fn next(&mut self, value: Item) { self.observer.next((*self.f)(value)) }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S, B, F> Observable for MapOp<S, F>
where
  S: Observable,
  B: Send + 'static,
  F: Fn(S::Item) -> B + Send + Sync + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<B, S::Err>) -> Subscription {
    self
      .source
      .subscribe_core(Box::new(MapObserver { observer, f: self.f.clone() }))
  }
}
