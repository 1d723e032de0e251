use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

/// Running fold: emits every intermediate accumulator value. The seed itself
/// is not emitted.
pub struct ScanOp<S, B, F> {
  source: S,
  seed: B,
  accumulator: Arc<F>,
}

impl<S, B, F> ScanOp<S, B, F> {
  pub(crate) fn new(source: S, seed: B, accumulator: F) -> Self {
    Self { source, seed, accumulator: Arc::new(accumulator) }
  }
}

struct ScanObserver<O, B, F> {
  observer: O,
  acc: B,
  accumulator: Arc<F>,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for ScanObserver<O, B, F>
where
  B: Clone,
  O: Observer<B, Err>,
  F: Fn(B, Item) -> B,
{
  fn next(&mut self, value: Item) {
    self.acc = (*self.accumulator)(self.acc.clone(), value);
    self.observer.next(self.acc.clone());
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S, B, F> Observable for ScanOp<S, B, F>
where
  S: Observable,
  B: Clone + Send + Sync + 'static,
  F: Fn(B, S::Item) -> B + Send + Sync + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<B, S::Err>) -> Subscription {
    self.source.subscribe_core(Box::new(ScanObserver {
      observer,
      acc: self.seed.clone(),
      accumulator: self.accumulator.clone(),
    }))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn emits_running_totals() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=4)
      .scan(0, |acc, v| acc + v)
      .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(&*seen.lock().unwrap(), &[1, 3, 6, 10]);
  }

  #[test]
  fn each_subscription_starts_from_the_seed() {
    let source = from_iter::<_, ()>(1..=2).scan(100, |acc, v| acc + v);
    for _ in 0..2 {
      let seen = Arc::new(Mutex::new(Vec::new()));
      let s = seen.clone();
      source.subscribe(move |v| s.lock().unwrap().push(v));
      assert_eq!(&*seen.lock().unwrap(), &[101, 103]);
    }
  }
}
