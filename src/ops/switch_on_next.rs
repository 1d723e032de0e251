use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::{SerialSubscription, Subscription};

/// Mirrors only the most recently emitted inner stream. Each new inner
/// disposes the previous one; events from a displaced inner that are already
/// in flight are dropped by a generation check. The result completes when
/// the outer has completed and the last active inner completes.
pub struct SwitchOnNextOp<S> {
  source: S,
}

impl<S> SwitchOnNextOp<S> {
  pub(crate) fn new(source: S) -> Self { Self { source } }
}

struct SwitchState {
  generation: u64,
  inner_active: bool,
  outer_done: bool,
}

struct Shared<Item, Err> {
  sink: Sink<Item, Err>,
  current: SerialSubscription,
  state: Mutex<SwitchState>,
}

struct OuterObserver<Inner: Observable> {
  shared: Arc<Shared<Inner::Item, Inner::Err>>,
}

impl<Inner> Observer<Inner, Inner::Err> for OuterObserver<Inner>
where
  Inner: Observable,
{
  fn next(&mut self, inner: Inner) {
    let generation = {
      let mut state = self.shared.state.lock().unwrap();
      state.generation += 1;
      state.inner_active = true;
      state.generation
    };
    // Dispose the displaced inner before subscribing its successor.
    self.shared.current.swap(Subscription::closed());
    let upstream = inner.subscribe_core(Box::new(InnerObserver {
      shared: self.shared.clone(),
      generation,
    }));
    self.shared.current.swap(upstream);
  }

  fn error(&mut self, err: Inner::Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    let finish = {
      let mut state = self.shared.state.lock().unwrap();
      state.outer_done = true;
      !state.inner_active
    };
    if finish {
      self.shared.sink.complete();
    }
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

struct InnerObserver<Item, Err> {
  shared: Arc<Shared<Item, Err>>,
  generation: u64,
}

impl<Item, Err> InnerObserver<Item, Err> {
  fn is_current(&self) -> bool {
    self.shared.state.lock().unwrap().generation == self.generation
  }
}

impl<Item, Err> Observer<Item, Err> for InnerObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.is_current() {
      self.shared.sink.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.is_current() {
      self.shared.sink.error(err);
    }
  }

  fn complete(&mut self) {
    let finish = {
      let mut state = self.shared.state.lock().unwrap();
      if state.generation != self.generation {
        return;
      }
      state.inner_active = false;
      state.outer_done
    };
    if finish {
      self.shared.sink.complete();
    }
  }

  fn is_stopped(&self) -> bool {
    self.shared.sink.is_done() || !self.is_current()
  }
}

impl<S> Observable for SwitchOnNextOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
{
  type Item = <S::Item as Observable>::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<Self::Item, Self::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let current = SerialSubscription::new();
    subscription.add(current.clone());
    let shared = Arc::new(Shared {
      sink,
      current,
      state: Mutex::new(SwitchState {
        generation: 0,
        inner_active: false,
        outer_done: false,
      }),
    });
    let upstream = self
      .source
      .subscribe_core(Box::new(OuterObserver { shared }));
    subscription.add(upstream);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::from_iter;
  use crate::observer::Event;
  use crate::subject::PublishSubject;

  #[test]
  fn new_inner_displaces_the_previous_one() {
    let outer = PublishSubject::<PublishSubject<i32, ()>, ()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    outer
      .clone()
      .switch_on_next()
      .subscribe(move |v| s.lock().unwrap().push(v));

    let a = PublishSubject::<i32, ()>::new();
    outer.next(a.clone());
    a.next(1);

    let b = PublishSubject::<i32, ()>::new();
    outer.next(b.clone());
    a.next(2); // displaced; dropped
    b.next(3);

    assert_eq!(&*seen.lock().unwrap(), &[1, 3]);
  }

  #[test]
  fn completes_after_outer_and_last_inner() {
    let outer = PublishSubject::<PublishSubject<i32, ()>, ()>::new();
    let log = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (l1, l2) = (log.clone(), log.clone());
    outer.clone().switch_on_next().subscribe_all(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      |_| {},
      move || l2.lock().unwrap().push(Event::Completed),
    );

    let a = PublishSubject::<i32, ()>::new();
    outer.next(a.clone());
    outer.complete();
    a.next(1);
    // Outer is done but the active inner keeps the stream alive.
    assert_eq!(&*log.lock().unwrap(), &[Event::Next(1)]);
    a.complete();
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Next(1), Event::Completed]
    );
  }

  #[test]
  fn switch_map_projects_then_switches() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=3)
      .switch_map(|v| from_iter(vec![v * 10, v * 10 + 1]))
      .subscribe(move |v| s.lock().unwrap().push(v));
    // Synchronous inners run to completion before the next outer element.
    assert_eq!(&*seen.lock().unwrap(), &[10, 11, 20, 21, 30, 31]);
  }
}
