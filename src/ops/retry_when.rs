use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subject::PublishSubject;
use crate::subscription::{SerialSubscription, Subscription};

/// Retry governed by a notifier stream. Source errors are fed into a subject
/// handed to the notifier builder; every element the notifier emits triggers
/// one resubscription. The notifier terminating ends the subscription with
/// that terminal event, which is how a backoff policy says "give up".
pub struct RetryWhenOp<S, F> {
  source: Arc<S>,
  notifier: Arc<F>,
}

impl<S, F> RetryWhenOp<S, F> {
  pub(crate) fn new(source: S, notifier: F) -> Self {
    Self { source: Arc::new(source), notifier: Arc::new(notifier) }
  }
}

struct DrainState {
  pending: usize,
  draining: bool,
}

struct Shared<S: Observable> {
  source: Arc<S>,
  sink: Sink<S::Item, S::Err>,
  errors: PublishSubject<S::Err, S::Err>,
  current: SerialSubscription,
  state: Mutex<DrainState>,
}

fn drive<S: Observable>(shared: &Arc<Shared<S>>)
where
  S::Err: Clone,
{
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
      .subscribe_core(Box::new(SourceObserver { shared: shared.clone() }));
    shared.current.swap(upstream);
  }
}

struct SourceObserver<S: Observable> {
  shared: Arc<Shared<S>>,
}

impl<S> Observer<S::Item, S::Err> for SourceObserver<S>
where
  S: Observable,
  S::Err: Clone,
{
  fn next(&mut self, value: S::Item) { self.shared.sink.next(value); }

  fn error(&mut self, err: S::Err) {
    // Hand the error to the notifier pipeline; resubscription happens only
    // if the notifier reacts with an element.
    self.shared.errors.next(err);
  }

  fn complete(&mut self) { self.shared.sink.complete(); }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

struct NotifierObserver<S: Observable> {
  shared: Arc<Shared<S>>,
}

impl<S, NI> Observer<NI, S::Err> for NotifierObserver<S>
where
  S: Observable,
  S::Err: Clone,
{
  fn next(&mut self, _signal: NI) {
    self.shared.state.lock().unwrap().pending += 1;
    drive(&self.shared);
  }

  fn error(&mut self, err: S::Err) { self.shared.sink.error(err); }

  fn complete(&mut self) { self.shared.sink.complete(); }

  fn is_stopped(&self) -> bool { self.shared.sink.is_done() }
}

impl<S, N, F> Observable for RetryWhenOp<S, F>
where
  S: Observable,
  S::Err: Clone,
  N: Observable<Err = S::Err>,
  F: Fn(PublishSubject<S::Err, S::Err>) -> N + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let current = SerialSubscription::new();
    subscription.add(current.clone());
    let errors = PublishSubject::new();
    let shared = Arc::new(Shared {
      source: self.source.clone(),
      sink,
      errors: errors.clone(),
      current,
      state: Mutex::new(DrainState { pending: 1, draining: false }),
    });
    let notifier = (*self.notifier)(errors);
    let notifier_sub =
      notifier.subscribe_core(Box::new(NotifierObserver::<S> { shared: shared.clone() }));
    subscription.add(notifier_sub);
    drive(&shared);
    subscription
  }
}
