use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Pairs the n-th element of one source with the n-th of the other through
/// `f`. Elements wait in per-source queues until their partner arrives.
/// Completes as soon as a completed source's queue is empty, because no
/// further pair can form then.
pub struct ZipOp<A, B, F> {
  a: A,
  b: B,
  f: Arc<F>,
}

impl<A, B, F> ZipOp<A, B, F> {
  pub(crate) fn new(a: A, b: B, f: F) -> Self {
    Self { a, b, f: Arc::new(f) }
  }
}

struct ZipState<VA, VB> {
  qa: VecDeque<VA>,
  qb: VecDeque<VB>,
  a_done: bool,
  b_done: bool,
}

impl<VA, VB> ZipState<VA, VB> {
  fn exhausted(&self) -> bool {
    (self.a_done && self.qa.is_empty()) || (self.b_done && self.qb.is_empty())
  }
}

struct ZipShared<VA, VB, Out, Err, F> {
  sink: Sink<Out, Err>,
  f: Arc<F>,
  state: Mutex<ZipState<VA, VB>>,
}

impl<VA, VB, Out, Err, F> ZipShared<VA, VB, Out, Err, F>
where
  F: Fn(VA, VB) -> Out,
{
  /// Emit every ready pair, then complete if no further pair can form.
  fn settle(&self) {
    loop {
      // Pop under the lock, run the selector outside it: a selector that
      // re-enters the pipeline must not find the state lock held.
      let (a, b) = {
        let mut state = self.state.lock().unwrap();
        if state.qa.is_empty() || state.qb.is_empty() {
          if state.exhausted() {
            drop(state);
            self.sink.complete();
          }
          return;
        }
        let a = state.qa.pop_front().unwrap();
        let b = state.qb.pop_front().unwrap();
        (a, b)
      };
      self.sink.next((*self.f)(a, b));
    }
  }
}

struct ZipLeft<VA, VB, Out, Err, F> {
  shared: Arc<ZipShared<VA, VB, Out, Err, F>>,
}

struct ZipRight<VA, VB, Out, Err, F> {
  shared: Arc<ZipShared<VA, VB, Out, Err, F>>,
}

impl<VA, VB, Out, Err, F> Observer<VA, Err> for ZipLeft<VA, VB, Out, Err, F>
where
  F: Fn(VA, VB) -> Out,
{
  fn next(&mut self, value: VA) {
    self.shared.state.lock().unwrap().qa.push_back(value);
    self.shared.settle();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    self.shared.state.lock().unwrap().a_done = true;
    self.shared.settle();
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<VA, VB, Out, Err, F> Observer<VB, Err> for ZipRight<VA, VB, Out, Err, F>
where
  F: Fn(VA, VB) -> Out,
{
  fn next(&mut self, value: VB) {
    self.shared.state.lock().unwrap().qb.push_back(value);
    self.shared.settle();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    self.shared.state.lock().unwrap().b_done = true;
    self.shared.settle();
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<A, B, Out, F> Observable for ZipOp<A, B, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  Out: Send + 'static,
  F: Fn(A::Item, B::Item) -> Out + Send + Sync + 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn subscribe_core(&self, observer: BoxObserver<Out, A::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let shared = Arc::new(ZipShared {
      sink: sink.clone(),
      f: self.f.clone(),
      state: Mutex::new(ZipState {
        qa: VecDeque::new(),
        qb: VecDeque::new(),
        a_done: false,
        b_done: false,
      }),
    });
    let sub_a = self.a.subscribe_core(Box::new(ZipLeft { shared: shared.clone() }));
    subscription.add(sub_a);
    if sink.is_done() {
      return subscription;
    }
    let sub_b = self.b.subscribe_core(Box::new(ZipRight { shared }));
    subscription.add(sub_b);
    subscription
  }
}

/// Homogeneous n-ary zip: emits the vector of n-th elements. An empty
/// source list completes immediately.
pub struct ZipAllOp<S> {
  sources: Arc<Vec<S>>,
}

pub fn zip_all<S>(sources: Vec<S>) -> ZipAllOp<S>
where
  S: Observable,
{
  ZipAllOp { sources: Arc::new(sources) }
}

struct ZipAllState<V> {
  queues: Vec<VecDeque<V>>,
  done: Vec<bool>,
}

impl<V> ZipAllState<V> {
  fn exhausted(&self) -> bool {
    self
      .queues
      .iter()
      .zip(&self.done)
      .any(|(q, done)| *done && q.is_empty())
  }
}

struct ZipAllShared<V, Err> {
  sink: Sink<Vec<V>, Err>,
  state: Mutex<ZipAllState<V>>,
}

impl<V, Err> ZipAllShared<V, Err> {
  fn settle(&self) {
    loop {
      let out = {
        let mut state = self.state.lock().unwrap();
        if state.queues.iter().all(|q| !q.is_empty()) {
          Some(
            state
              .queues
              .iter_mut()
              .map(|q| q.pop_front().unwrap())
              .collect::<Vec<_>>(),
          )
        } else {
          if state.exhausted() {
            drop(state);
            self.sink.complete();
          }
          return;
        }
      };
      if let Some(out) = out {
        self.sink.next(out);
      }
    }
  }
}

struct ZipAllObserver<V, Err> {
  shared: Arc<ZipAllShared<V, Err>>,
  index: usize,
}

impl<V, Err> Observer<V, Err> for ZipAllObserver<V, Err> {
  fn next(&mut self, value: V) {
    self.shared.state.lock().unwrap().queues[self.index].push_back(value);
    self.shared.settle();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    self.shared.state.lock().unwrap().done[self.index] = true;
    self.shared.settle();
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S> Observable for ZipAllOp<S>
where
  S: Observable,
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
    let shared = Arc::new(ZipAllShared {
      sink: sink.clone(),
      state: Mutex::new(ZipAllState {
        queues: (0..self.sources.len()).map(|_| VecDeque::new()).collect(),
        done: vec![false; self.sources.len()],
      }),
    });
    for (index, source) in self.sources.iter().enumerate() {
      if sink.is_done() {
        break;
      }
      let upstream =
        source.subscribe_core(Box::new(ZipAllObserver { shared: shared.clone(), index }));
      subscription.add(upstream);
    }
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
  fn pairs_by_position() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<&'static str, ()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    a.clone()
      .zip(b.clone(), |x, y| (x, y))
      .subscribe(move |v| s.lock().unwrap().push(v));

    a.next(1);
    a.next(2);
    b.next("one");
    b.next("two");
    a.next(3);

    assert_eq!(&*seen.lock().unwrap(), &[(1, "one"), (2, "two")]);
  }

  #[test]
  fn completes_when_a_done_queue_runs_dry() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (l1, l2) = (log.clone(), log.clone());
    a.clone().zip(b.clone(), |x, y| x + y).subscribe_all(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      |_| {},
      move || l2.lock().unwrap().push(Event::Completed),
    );

    a.next(1);
    a.complete();
    // a is done but its element is still queued; the zip stays open.
    assert!(log.lock().unwrap().is_empty());
    b.next(10);
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Next(11), Event::Completed]
    );
  }

  #[test]
  fn a_reentrant_selector_does_not_deadlock() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let a2 = a.clone();
    a.clone()
      .zip(b.clone(), move |x, y| {
        // Feed the pipeline from inside the selector.
        if x == 1 {
          a2.next(3);
        }
        x + y
      })
      .subscribe(move |v| s.lock().unwrap().push(v));

    a.next(1);
    a.next(2);
    b.next(10);
    b.next(20);
    b.next(30);
    assert_eq!(&*seen.lock().unwrap(), &[11, 22, 33]);
  }

  #[test]
  fn n_ary_zip_lockstep() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    zip_all(vec![
      from_iter::<_, ()>(vec![1, 2, 3]),
      from_iter(vec![10, 20]),
      from_iter(vec![100, 200, 300]),
    ])
    .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(
      &*seen.lock().unwrap(),
      &[vec![1, 10, 100], vec![2, 20, 200]]
    );
  }
}
