use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Flattens a stream of streams, running at most `max_concurrent` inner
/// subscriptions at once (`0` = unbounded). Inners beyond the cap queue in
/// arrival order and activate as running ones complete; `max_concurrent == 1`
/// therefore degenerates to sequential concatenation. Completes when the
/// outer and every inner have completed; the first error from anywhere wins.
pub struct MergeAllOp<S> {
  source: S,
  max_concurrent: usize,
}

impl<S> MergeAllOp<S> {
  pub(crate) fn new(source: S, max_concurrent: usize) -> Self {
    Self { source, max_concurrent }
  }
}

struct State<Inner> {
  active: usize,
  queue: VecDeque<Inner>,
  outer_done: bool,
  // Inner completions not yet folded into `active` by the drain loop.
  finished: usize,
  draining: bool,
}

struct Shared<Inner: Observable> {
  sink: Sink<Inner::Item, Inner::Err>,
  subscription: Subscription,
  max_concurrent: usize,
  state: Mutex<State<Inner>>,
}

enum Action<Inner> {
  Start(Inner),
  Complete,
  Park,
}

/// Single drain loop per merge: all state transitions (arrivals, inner
/// completions, outer completion) funnel through here, and re-entrant calls
/// fall out on the `draining` flag instead of recursing.
fn drive<Inner>(shared: &Arc<Shared<Inner>>)
where
  Inner: Observable,
{
  {
    let mut state = shared.state.lock().unwrap();
    if state.draining {
      return;
    }
    state.draining = true;
  }
  loop {
    let action = {
      let mut state = shared.state.lock().unwrap();
      if shared.sink.is_done() {
        state.draining = false;
        return;
      }
      while state.finished > 0 {
        state.finished -= 1;
        state.active -= 1;
      }
      let below_cap = shared.max_concurrent == 0 || state.active < shared.max_concurrent;
      if below_cap && !state.queue.is_empty() {
        state.active += 1;
        Action::Start(state.queue.pop_front().unwrap())
      } else if state.outer_done && state.active == 0 && state.queue.is_empty() {
        Action::Complete
      } else {
        state.draining = false;
        Action::Park
      }
    };
    match action {
      Action::Start(inner) => {
        let upstream = inner.subscribe_core(Box::new(InnerObserver { shared: shared.clone() }));
        shared.subscription.add(upstream);
      }
      Action::Complete => {
        shared.sink.complete();
        shared.state.lock().unwrap().draining = false;
        return;
      }
      Action::Park => return,
    }
  }
}

struct OuterObserver<Inner: Observable> {
  shared: Arc<Shared<Inner>>,
}

impl<Inner> Observer<Inner, Inner::Err> for OuterObserver<Inner>
where
  Inner: Observable,
{
  fn next(&mut self, inner: Inner) {
    self.shared.state.lock().unwrap().queue.push_back(inner);
    drive(&self.shared);
  }

  fn error(&mut self, err: Inner::Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    self.shared.state.lock().unwrap().outer_done = true;
    drive(&self.shared);
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

struct InnerObserver<Inner: Observable> {
  shared: Arc<Shared<Inner>>,
}

impl<Inner> Observer<Inner::Item, Inner::Err> for InnerObserver<Inner>
where
  Inner: Observable,
{
  fn next(&mut self, value: Inner::Item) { self.shared.sink.next(value); }

  fn error(&mut self, err: Inner::Err) { self.shared.sink.error(err); }

  fn complete(&mut self) {
    self.shared.state.lock().unwrap().finished += 1;
    drive(&self.shared);
  }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S> Observable for MergeAllOp<S>
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
    let shared = Arc::new(Shared {
      sink,
      subscription: subscription.clone(),
      max_concurrent: self.max_concurrent,
      state: Mutex::new(State {
        active: 0,
        queue: VecDeque::new(),
        outer_done: false,
        finished: 0,
        draining: false,
      }),
    });
    let upstream = self
      .source
      .subscribe_core(Box::new(OuterObserver { shared }));
    subscription.add(upstream);
    subscription
  }
}
