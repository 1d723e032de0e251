//! Bridge factory: wrap an imperative callback producer as an observable.

use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::sink::Sink;
use crate::subscription::{Subscription, SubscriptionLike};

/// The producer-side handle given to a [`create`] callback.
///
/// Enforces the subscription protocol on behalf of the producer: events after
/// a terminal one are dropped, and once the subscription is disposed the
/// emitter turns inert.
pub struct Emitter<Item, Err> {
  sink: Sink<Item, Err>,
  subscription: Subscription,
}

impl<Item, Err> Clone for Emitter<Item, Err> {
  fn clone(&self) -> Self {
    Self { sink: self.sink.clone(), subscription: self.subscription.clone() }
  }
}

impl<Item, Err> Emitter<Item, Err> {
  pub fn next(&self, value: Item) { self.sink.next(value); }

  pub fn error(&self, err: Err) { self.sink.error(err); }

  pub fn complete(&self) { self.sink.complete(); }

  /// `true` once a terminal event was emitted or the consumer disposed.
  /// Long-running producers should poll this and stop.
  pub fn is_disposed(&self) -> bool { self.sink.is_done() }

  /// Register cleanup to run when the subscription ends for any reason.
  pub fn add_teardown<F: FnOnce() + Send + 'static>(&self, f: F) {
    self.subscription.add_teardown(f);
  }

  /// Tie a resource's lifetime to this subscription.
  pub fn add<S: SubscriptionLike + 'static>(&self, subscription: S) {
    self.subscription.add(subscription);
  }
}

pub struct CreateObservable<Item, Err, F> {
  producer: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

/// Build an observable from a producer callback invoked once per
/// subscription.
pub fn create<Item, Err, F>(producer: F) -> CreateObservable<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn(Emitter<Item, Err>) + Send + Sync + 'static,
{
  CreateObservable { producer, _marker: PhantomData }
}

impl<Item, Err, F> Observable for CreateObservable<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn(Emitter<Item, Err>) + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    // A natural terminal releases the producer's tied resources without
    // waiting for the consumer to dispose.
    sink.on_terminal({
      let mut handle = subscription.clone();
      move || handle.unsubscribe()
    });
    subscription.add(sink.clone());
    (self.producer)(Emitter { sink, subscription: subscription.clone() });
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use super::*;

  #[test]
  fn producer_runs_per_subscription() {
    let source = create(|emitter: Emitter<i32, ()>| {
      emitter.next(1);
      emitter.next(2);
      emitter.complete();
    });

    for _ in 0..2 {
      let seen = Arc::new(Mutex::new(Vec::new()));
      let completed = Arc::new(AtomicBool::new(false));
      let s = seen.clone();
      let c = completed.clone();
      source.subscribe_all(
        move |v| s.lock().unwrap().push(v),
        |_| {},
        move || c.store(true, Ordering::SeqCst),
      );
      assert_eq!(&*seen.lock().unwrap(), &[1, 2]);
      assert!(completed.load(Ordering::SeqCst));
    }
  }

  #[test]
  fn events_after_terminal_are_dropped() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    create(|emitter: Emitter<i32, &'static str>| {
      emitter.next(1);
      emitter.complete();
      emitter.next(2);
      emitter.error("late");
      assert!(emitter.is_disposed());
    })
    .subscribe_err(move |v| s.lock().unwrap().push(v), |_| {});

    assert_eq!(&*seen.lock().unwrap(), &[1]);
  }

  #[test]
  fn teardown_runs_at_natural_completion() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let t = torn_down.clone();
    let source = create(move |emitter: Emitter<i32, ()>| {
      let t = t.clone();
      emitter.add_teardown(move || t.store(true, Ordering::SeqCst));
      emitter.next(1);
      emitter.complete();
    });

    let subscription = source.subscribe(|_| {});
    assert!(torn_down.load(Ordering::SeqCst));
    assert!(subscription.is_closed());
  }

  #[test]
  fn teardown_runs_at_error_too() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let t = torn_down.clone();
    create(move |emitter: Emitter<i32, &'static str>| {
      let t = t.clone();
      emitter.add_teardown(move || t.store(true, Ordering::SeqCst));
      emitter.error("boom");
    })
    .subscribe_err(|_| {}, |_| {});

    assert!(torn_down.load(Ordering::SeqCst));
  }

  #[test]
  fn teardown_runs_on_dispose() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let t = torn_down.clone();
    let source = create(move |emitter: Emitter<i32, ()>| {
      let t = t.clone();
      emitter.add_teardown(move || t.store(true, Ordering::SeqCst));
      emitter.next(1);
    });

    let mut subscription = source.subscribe(|_| {});
    assert!(!torn_down.load(Ordering::SeqCst));
    subscription.unsubscribe();
    assert!(torn_down.load(Ordering::SeqCst));
  }
}
