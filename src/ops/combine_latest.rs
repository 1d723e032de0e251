use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Emits `f(latest_a, latest_b)` whenever either source emits, once both
/// have emitted at least once.
///
/// Completion follows the "no further output possible" rule: if a source
/// completes without ever emitting, nothing can ever be produced and the
/// result completes immediately; otherwise it completes when both sources
/// have completed.
pub struct CombineLatestOp<A, B, F> {
  a: A,
  b: B,
  f: Arc<F>,
}

impl<A, B, F> CombineLatestOp<A, B, F> {
  pub(crate) fn new(a: A, b: B, f: F) -> Self {
    Self { a, b, f: Arc::new(f) }
  }
}

struct PairState<VA, VB> {
  a: Option<VA>,
  b: Option<VB>,
  a_done: bool,
  b_done: bool,
}

struct PairShared<VA, VB, Out, Err, F> {
  sink: Sink<Out, Err>,
  f: Arc<F>,
  state: Mutex<PairState<VA, VB>>,
}

// Which side of the pair an observer feeds.
#[derive(Clone, Copy, PartialEq)]
enum Side {
  Left,
  Right,
}

struct SideObserver<VA, VB, Out, Err, F> {
  shared: Arc<PairShared<VA, VB, Out, Err, F>>,
  side: Side,
}

impl<VA, VB, Out, Err, F> SideObserver<VA, VB, Out, Err, F>
where
  VA: Clone,
  VB: Clone,
  F: Fn(VA, VB) -> Out,
{
  fn push(&self, update: impl FnOnce(&mut PairState<VA, VB>)) {
    // Snapshot under the lock, run the selector outside it: a selector that
    // re-enters the pipeline must not find the state lock held.
    let latest = {
      let mut state = self.shared.state.lock().unwrap();
      update(&mut state);
      match (&state.a, &state.b) {
        (Some(a), Some(b)) => Some((a.clone(), b.clone())),
        _ => None,
      }
    };
    if let Some((a, b)) = latest {
      self.shared.sink.next((*self.shared.f)(a, b));
    }
  }

  fn finish_side(&self) {
    let complete = {
      let mut state = self.shared.state.lock().unwrap();
      match self.side {
        Side::Left => state.a_done = true,
        Side::Right => state.b_done = true,
      }
      let never_emitted = match self.side {
        Side::Left => state.a.is_none(),
        Side::Right => state.b.is_none(),
      };
      never_emitted || (state.a_done && state.b_done)
    };
    if complete {
      self.shared.sink.complete();
    }
  }
}

struct LeftObserver<VA, VB, Out, Err, F>(SideObserver<VA, VB, Out, Err, F>);
struct RightObserver<VA, VB, Out, Err, F>(SideObserver<VA, VB, Out, Err, F>);

impl<VA, VB, Out, Err, F> Observer<VA, Err> for LeftObserver<VA, VB, Out, Err, F>
where
  VA: Clone,
  VB: Clone,
  F: Fn(VA, VB) -> Out,
{
  fn next(&mut self, value: VA) {
    self.0.push(|state| state.a = Some(value));
  }

  fn error(&mut self, err: Err) { self.0.shared.sink.error(err); }

  fn complete(&mut self) { self.0.finish_side(); }

  fn is_stopped(&self) -> bool { self.0.shared.sink.is_done() }
}

impl<VA, VB, Out, Err, F> Observer<VB, Err> for RightObserver<VA, VB, Out, Err, F>
where
  VA: Clone,
  VB: Clone,
  F: Fn(VA, VB) -> Out,
{
  fn next(&mut self, value: VB) {
    self.0.push(|state| state.b = Some(value));
  }

  fn error(&mut self, err: Err) { self.0.shared.sink.error(err); }

  fn complete(&mut self) { self.0.finish_side(); }

  fn is_stopped(&self) -> bool { self.0.shared.sink.is_done() }
}

impl<A, B, Out, F> Observable for CombineLatestOp<A, B, F>
where
  A: Observable,
  A::Item: Clone,
  B: Observable<Err = A::Err>,
  B::Item: Clone,
  Out: Send + 'static,
  F: Fn(A::Item, B::Item) -> Out + Send + Sync + 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn subscribe_core(&self, observer: BoxObserver<Out, A::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let shared = Arc::new(PairShared {
      sink: sink.clone(),
      f: self.f.clone(),
      state: Mutex::new(PairState { a: None, b: None, a_done: false, b_done: false }),
    });
    let sub_a = self.a.subscribe_core(Box::new(LeftObserver(SideObserver {
      shared: shared.clone(),
      side: Side::Left,
    })));
    subscription.add(sub_a);
    if sink.is_done() {
      return subscription;
    }
    let sub_b = self.b.subscribe_core(Box::new(RightObserver(SideObserver {
      shared,
      side: Side::Right,
    })));
    subscription.add(sub_b);
    subscription
  }
}

/// Homogeneous n-ary combine: emits the vector of latest values. Same
/// completion rule as the binary form; an empty source list completes
/// immediately.
pub struct CombineLatestAllOp<S> {
  sources: Arc<Vec<S>>,
}

pub fn combine_latest_all<S>(sources: Vec<S>) -> CombineLatestAllOp<S>
where
  S: Observable,
  S::Item: Clone,
{
  CombineLatestAllOp { sources: Arc::new(sources) }
}

struct AllState<V> {
  values: Vec<Option<V>>,
  done: Vec<bool>,
}

struct AllShared<V, Err> {
  sink: Sink<Vec<V>, Err>,
  state: Mutex<AllState<V>>,
}

struct AllObserver<V, Err> {
  shared: Arc<AllShared<V, Err>>,
  index: usize,
}

impl<V, Err> Observer<V, Err> for AllObserver<V, Err>
where
  V: Clone,
{
  fn next(&mut self, value: V) {
    let out = {
      let mut state = self.shared.state.lock().unwrap();
      state.values[self.index] = Some(value);
      if state.values.iter().all(Option::is_some) {
        Some(state.values.iter().map(|v| v.clone().unwrap()).collect::<Vec<_>>())
      } else {
        None
      }
    };
    if let Some(out) = out {
      self.shared.sink.next(out);
    }
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    let complete = {
      let mut state = self.shared.state.lock().unwrap();
      state.done[self.index] = true;
      state.values[self.index].is_none() || state.done.iter().all(|d| *d)
    };
    if complete {
      self.shared.sink.complete();
    }
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S> Observable for CombineLatestAllOp<S>
where
  S: Observable,
  S::Item: Clone,
{
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<Vec<S::Item>, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    if self.sources.is_empty() {
      sink.complete();
      return subscription;
    }
    let shared = Arc::new(AllShared {
      sink: sink.clone(),
      state: Mutex::new(AllState {
        values: vec![None; self.sources.len()],
        done: vec![false; self.sources.len()],
      }),
    });
    for (index, source) in self.sources.iter().enumerate() {
      if sink.is_done() {
        break;
      }
      let upstream =
        source.subscribe_core(Box::new(AllObserver { shared: shared.clone(), index }));
      subscription.add(upstream);
    }
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::empty;
  use crate::observer::Event;
  use crate::subject::PublishSubject;

  fn pair() -> (
    PublishSubject<i32, ()>,
    PublishSubject<i32, ()>,
    Arc<Mutex<Vec<Event<(i32, i32), ()>>>>,
  ) {
    let a = PublishSubject::new();
    let b = PublishSubject::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    a.clone()
      .combine_latest(b.clone(), |x, y| (x, y))
      .subscribe_all(
        move |v| l1.lock().unwrap().push(Event::Next(v)),
        |_| {},
        move || l2.lock().unwrap().push(Event::Completed),
      );
    (a, b, log)
  }

  #[test]
  fn first_output_waits_for_both_sources() {
    let (a, b, log) = pair();
    a.next(1);
    a.next(2);
    assert!(log.lock().unwrap().is_empty());
    b.next(10);
    a.next(3);
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Next((2, 10)), Event::Next((3, 10))]
    );
  }

  #[test]
  fn completes_when_no_output_is_possible() {
    let (a, b, log) = pair();
    a.next(1);
    // b completes without ever emitting: no pair can ever form.
    b.complete();
    assert_eq!(&*log.lock().unwrap(), &[Event::Completed]);
    drop(a);
  }

  #[test]
  fn completes_after_both_when_both_emitted() {
    let (a, b, log) = pair();
    a.next(1);
    b.next(2);
    a.complete();
    b.next(3);
    b.complete();
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Next((1, 2)), Event::Next((1, 3)), Event::Completed]
    );
  }

  #[test]
  fn empty_source_completes_the_combination_immediately() {
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    let a = PublishSubject::<i32, ()>::new();
    a.clone()
      .combine_latest(empty::<i32, ()>(), |x, y| (x, y))
      .subscribe_all(|_| {}, |_| {}, move || *c.lock().unwrap() = true);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn a_reentrant_selector_does_not_deadlock() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let b2 = b.clone();
    a.clone()
      .combine_latest(b.clone(), move |x, y| {
        // Feed the pipeline from inside the selector.
        if y == 0 {
          b2.next(10);
        }
        (x, y)
      })
      .subscribe(move |v| s.lock().unwrap().push(v));

    a.next(1);
    b.next(0);
    // The re-entrant emission resolves first; the outer frame's pair
    // follows once its selector returns.
    assert_eq!(&*seen.lock().unwrap(), &[(1, 10), (1, 0)]);
  }

  #[test]
  fn n_ary_emits_snapshots() {
    let sources: Vec<PublishSubject<i32, ()>> =
      (0..3).map(|_| PublishSubject::new()).collect();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    combine_latest_all(sources.clone()).subscribe(move |v| s.lock().unwrap().push(v));

    sources[0].next(1);
    sources[1].next(2);
    assert!(seen.lock().unwrap().is_empty());
    sources[2].next(3);
    sources[0].next(9);
    assert_eq!(&*seen.lock().unwrap(), &[vec![1, 2, 3], vec![9, 2, 3]]);
  }
}
