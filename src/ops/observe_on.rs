use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Re-delivers every event as a scheduled task on the given scheduler.
///
/// With a serial scheduler element order is preserved. Disposal cancels
/// scheduled-but-undelivered tasks, so an element in flight at dispose time
/// is swallowed rather than delivered late.
pub struct ObserveOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> ObserveOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self {
    Self { source, scheduler }
  }
}

struct ObserveOnObserver<Item, Err, SD> {
  sink: Sink<Item, Err>,
  scheduler: SD,
  subscription: Subscription,
}

impl<Item, Err, SD> Observer<Item, Err> for ObserveOnObserver<Item, Err, SD>
where
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    let sink = self.sink.clone();
    let handle = self.scheduler.schedule(Box::new(move || sink.next(value)));
    self.subscription.add(handle);
  }

  fn error(&mut self, err: Err) {
    let sink = self.sink.clone();
    let handle = self.scheduler.schedule(Box::new(move || sink.error(err)));
    self.subscription.add(handle);
  }

  fn complete(&mut self) {
    let sink = self.sink.clone();
    let handle = self.scheduler.schedule(Box::new(move || sink.complete()));
    self.subscription.add(handle);
  }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<S, SD> Observable for ObserveOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let upstream = self.source.subscribe_core(Box::new(ObserveOnObserver {
      sink,
      scheduler: self.scheduler.clone(),
      subscription: subscription.clone(),
    }));
    subscription.add(upstream);
    subscription
  }
}
