use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::{SerialSubscription, Subscription};

/// Runs each source to completion before subscribing the next. An error from
/// the active source short-circuits the whole sequence; later sources are
/// never subscribed.
pub struct ConcatOp<S> {
  sources: Arc<Vec<S>>,
}

impl<S> ConcatOp<S> {
  pub(crate) fn new(sources: Vec<S>) -> Self {
    Self { sources: Arc::new(sources) }
  }
}

/// Concatenate a homogeneous list of sources.
pub fn concat_all<S: Observable>(sources: Vec<S>) -> ConcatOp<S> {
  ConcatOp::new(sources)
}

struct DrainState {
  next_index: usize,
  pending: usize,
  draining: bool,
}

struct Shared<S: Observable> {
  sources: Arc<Vec<S>>,
  sink: Sink<S::Item, S::Err>,
  current: SerialSubscription,
  state: Mutex<DrainState>,
}

/// Subscribe sources one at a time. Completions signal through `pending` and
/// are consumed by whichever call currently holds the `draining` flag, so a
/// long chain of synchronously completing sources runs as a loop instead of
/// recursing subscribe-inside-complete.
fn drive<S: Observable>(shared: &Arc<Shared<S>>) {
  {
    let mut state = shared.state.lock().unwrap();
    state.pending += 1;
    if state.draining {
      return;
    }
    state.draining = true;
  }
  loop {
    let index = {
      let mut state = shared.state.lock().unwrap();
      if state.pending == 0 || shared.sink.is_done() {
        state.draining = false;
        return;
      }
      state.pending -= 1;
      let index = state.next_index;
      state.next_index += 1;
      index
    };
    if index >= shared.sources.len() {
      shared.sink.complete();
      shared.state.lock().unwrap().draining = false;
      return;
    }
    let upstream = shared.sources[index].subscribe_core(Box::new(ConcatObserver {
      shared: shared.clone(),
    }));
    shared.current.swap(upstream);
  }
}

struct ConcatObserver<S: Observable> {
  shared: Arc<Shared<S>>,
}

impl<S: Observable> Observer<S::Item, S::Err> for ConcatObserver<S> {
  fn next(&mut self, value: S::Item) { self.shared.sink.next(value); }

  fn error(&mut self, err: S::Err) { self.shared.sink.error(err); }

  fn complete(&mut self) { drive(&self.shared); }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S: Observable> Observable for ConcatOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let current = SerialSubscription::new();
    subscription.add(current.clone());
    let shared = Arc::new(Shared {
      sources: self.sources.clone(),
      sink,
      current,
      // pending starts at 0; the initial drive call accounts for the first
      // activation the same way a completion does.
      state: Mutex::new(DrainState { next_index: 0, pending: 0, draining: false }),
    });
    drive(&shared);
    subscription
  }
}
