use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

/// Drops elements equal to their immediate predecessor.
pub struct DistinctUntilChangedOp<S> {
  source: S,
}

impl<S> DistinctUntilChangedOp<S> {
  pub(crate) fn new(source: S) -> Self { Self { source } }
}

struct DistinctObserver<O, Item> {
  observer: O,
  last: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for DistinctObserver<O, Item>
where
  Item: PartialEq + Clone,
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.last.as_ref() != Some(&value) {
      self.last = Some(value.clone());
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S> Observable for DistinctUntilChangedOp<S>
where
  S: Observable,
  S::Item: PartialEq + Clone,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    self
      .source
      .subscribe_core(Box::new(DistinctObserver { observer, last: None }))
  }
}

/// Like [`DistinctUntilChangedOp`] but compares a derived key, so the
/// element type itself need not be comparable.
pub struct DistinctUntilChangedByOp<S, F> {
  source: S,
  key: Arc<F>,
}

impl<S, F> DistinctUntilChangedByOp<S, F> {
  pub(crate) fn new(source: S, key: F) -> Self {
    Self { source, key: Arc::new(key) }
  }
}

struct DistinctByObserver<O, F, K> {
  observer: O,
  key: Arc<F>,
  last: Option<K>,
}

impl<Item, Err, O, F, K> Observer<Item, Err> for DistinctByObserver<O, F, K>
where
  K: PartialEq,
  O: Observer<Item, Err>,
  F: Fn(&Item) -> K,
{
  fn next(&mut self, value: Item) {
    let key = (*self.key)(&value);
    if self.last.as_ref() != Some(&key) {
      self.last = Some(key);
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S, F, K> Observable for DistinctUntilChangedByOp<S, F>
where
  S: Observable,
  K: PartialEq + Send + 'static,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    self.source.subscribe_core(Box::new(DistinctByObserver {
      observer,
      key: self.key.clone(),
      last: None,
    }))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn drops_consecutive_duplicates_only() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(vec![1, 1, 2, 2, 2, 1, 3, 3])
      .distinct_until_changed()
      .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(&*seen.lock().unwrap(), &[1, 2, 1, 3]);
  }

  #[test]
  fn keyed_comparison_ignores_other_fields() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(vec![("a", 1), ("a", 2), ("b", 3)])
      .distinct_until_changed_by(|pair| pair.0)
      .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(&*seen.lock().unwrap(), &[("a", 1), ("b", 3)]);
  }
}
