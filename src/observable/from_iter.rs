use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::sink::Sink;
use crate::subscription::Subscription;

pub struct FromIterObservable<I, Err> {
  iter: I,
  _err: PhantomData<fn() -> Err>,
}

/// Emit every element of a cloneable iterator, then complete, synchronously
/// at subscribe time. Emission stops early if the consumer disposes from
/// inside a callback.
pub fn from_iter<I, Err>(iter: I) -> FromIterObservable<I, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  FromIterObservable { iter, _err: PhantomData }
}

impl<I, Err> Observable for FromIterObservable<I, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<I::Item, Err>) -> Subscription {
    let sink = Sink::new(observer);
    for value in self.iter.clone() {
      if sink.is_done() {
        return Subscription::closed();
      }
      sink.next(value);
    }
    sink.complete();
    Subscription::closed()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn emits_all_elements_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=4).subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(&*seen.lock().unwrap(), &[1, 2, 3, 4]);
  }

  #[test]
  fn each_subscription_replays_the_iterator() {
    let source = from_iter::<_, ()>(vec!["a", "b"]);
    for _ in 0..2 {
      let seen = Arc::new(Mutex::new(Vec::new()));
      let s = seen.clone();
      source.subscribe(move |v| s.lock().unwrap().push(v));
      assert_eq!(&*seen.lock().unwrap(), &["a", "b"]);
    }
  }
}
