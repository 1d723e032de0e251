use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Interleaves two sources. Completes when both complete; the first error
/// wins and tears the other source down.
pub struct MergeOp<A, B> {
  a: A,
  b: B,
}

impl<A, B> MergeOp<A, B> {
  pub(crate) fn new(a: A, b: B) -> Self { Self { a, b } }
}

struct MergeObserver<Item, Err> {
  sink: Sink<Item, Err>,
  remaining: Arc<Mutex<usize>>,
}

impl<Item, Err> Observer<Item, Err> for MergeObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.sink.next(value); }

  fn error(&mut self, err: Err) { self.sink.error(err); }

  fn complete(&mut self) {
    let last = {
      let mut remaining = self.remaining.lock().unwrap();
      *remaining -= 1;
      *remaining == 0
    };
    if last {
      self.sink.complete();
    }
  }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<A, B> Observable for MergeOp<A, B>
where
  A: Observable,
  B: Observable<Item = A::Item, Err = A::Err>,
{
  type Item = A::Item;
  type Err = A::Err;

  fn subscribe_core(&self, observer: BoxObserver<A::Item, A::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let remaining = Arc::new(Mutex::new(2usize));
    let sub_a = self.a.subscribe_core(Box::new(MergeObserver {
      sink: sink.clone(),
      remaining: remaining.clone(),
    }));
    subscription.add(sub_a);
    if sink.is_done() {
      // First source already terminated the merge; skip the second.
      return subscription;
    }
    let sub_b = self.b.subscribe_core(Box::new(MergeObserver { sink, remaining }));
    subscription.add(sub_b);
    subscription
  }
}
