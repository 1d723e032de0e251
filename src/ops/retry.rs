use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::{SerialSubscription, Subscription};

/// Resubscribes to the source on error. With a budget of `n` the source is
/// attempted at most `n + 1` times and the last error is forwarded once the
/// budget runs out; without a budget it retries forever. Elements from
/// failed attempts are not withheld.
pub struct RetryOp<S> {
  source: Arc<S>,
  budget: Option<usize>,
}

impl<S> RetryOp<S> {
  pub(crate) fn new(source: S, budget: Option<usize>) -> Self {
    Self { source: Arc::new(source), budget }
  }
}

struct RetryState {
  remaining: Option<usize>,
  pending: usize,
  draining: bool,
}

struct Shared<S: Observable> {
  source: Arc<S>,
  sink: Sink<S::Item, S::Err>,
  current: SerialSubscription,
  state: Mutex<RetryState>,
}

/// Resubscription trampoline: a synchronously erroring source signals
/// through `pending` and is resubscribed by the drive call already on the
/// stack instead of recursing.
fn drive<S: Observable>(shared: &Arc<Shared<S>>) {
  {
    let mut state = shared.state.lock().unwrap();
    if state.draining {
      return;
    }
    state.draining = true;
  }
  loop {
    {
      let mut state = shared.state.lock().unwrap();
      if state.pending == 0 || shared.sink.is_done() {
        state.draining = false;
        return;
      }
      state.pending -= 1;
    }
    let upstream = shared
      .source
      .subscribe_core(Box::new(RetryObserver { shared: shared.clone() }));
    shared.current.swap(upstream);
  }
}

struct RetryObserver<S: Observable> {
  shared: Arc<Shared<S>>,
}

impl<S: Observable> Observer<S::Item, S::Err> for RetryObserver<S> {
  fn next(&mut self, value: S::Item) { self.shared.sink.next(value); }

  fn error(&mut self, err: S::Err) {
    let exhausted = {
      let mut state = self.shared.state.lock().unwrap();
      match &mut state.remaining {
        Some(0) => true,
        Some(n) => {
          *n -= 1;
          state.pending += 1;
          false
        }
        None => {
          state.pending += 1;
          false
        }
      }
    };
    if exhausted {
      self.shared.sink.error(err);
    } else {
      drive(&self.shared);
    }
  }

  fn complete(&mut self) { self.shared.sink.complete(); }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S: Observable> Observable for RetryOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let current = SerialSubscription::new();
    subscription.add(current.clone());
    let shared = Arc::new(Shared {
      source: self.source.clone(),
      sink,
      current,
      state: Mutex::new(RetryState {
        remaining: self.budget,
        pending: 1,
        draining: false,
      }),
    });
    drive(&shared);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;
  use crate::observable::create;
  use crate::observer::Event;

  fn failing_twice() -> (Arc<AtomicUsize>, impl Observable<Item = i32, Err = &'static str>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let source = create(move |emitter: crate::observable::Emitter<i32, &'static str>| {
      let attempt = a.fetch_add(1, Ordering::SeqCst);
      emitter.next(attempt as i32);
      if attempt < 2 {
        emitter.error("flaky");
      } else {
        emitter.complete();
      }
    });
    (attempts, source)
  }

  #[test]
  fn retry_two_makes_exactly_three_attempts() {
    let (attempts, source) = failing_twice();
    let log = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (l1, l2) = (log.clone(), log.clone());
    source.retry(2).subscribe_all(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      |_| {},
      move || l2.lock().unwrap().push(Event::Completed),
    );

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
      &*log.lock().unwrap(),
      &[
        Event::Next(0),
        Event::Next(1),
        Event::Next(2),
        Event::Completed,
      ]
    );
  }

  #[test]
  fn exhausted_budget_forwards_the_last_error() {
    let (attempts, source) = failing_twice();
    let errs = Arc::new(Mutex::new(Vec::new()));
    let e = errs.clone();
    source
      .retry(1)
      .subscribe_err(|_| {}, move |err| e.lock().unwrap().push(err));

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(&*errs.lock().unwrap(), &["flaky"]);
  }

  #[test]
  fn deep_synchronous_retry_is_stack_safe() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let source = create(move |emitter: crate::observable::Emitter<i32, ()>| {
      if a.fetch_add(1, Ordering::SeqCst) < 50_000 {
        emitter.error(());
      } else {
        emitter.complete();
      }
    });
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    source
      .retry_forever()
      .subscribe_all(|_| {}, |_| {}, move || *c.lock().unwrap() = true);

    assert!(*completed.lock().unwrap());
    assert_eq!(attempts.load(Ordering::SeqCst), 50_001);
  }
}
