use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Performs the subscription side effect (the producer's setup code) on the
/// given scheduler instead of the caller's thread.
pub struct SubscribeOnOp<S, SD> {
  source: Arc<S>,
  scheduler: SD,
}

impl<S, SD> SubscribeOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self {
    Self { source: Arc::new(source), scheduler }
  }
}

impl<S, SD> Observable for SubscribeOnOp<S, SD>
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
    let source = self.source.clone();
    let downstream = subscription.clone();
    // Disposing before the task runs both cancels the task and, if the task
    // did run, disposes the upstream it registered.
    let handle = self.scheduler.schedule(Box::new(move || {
      let upstream = source.subscribe_core(Box::new(sink));
      downstream.add(upstream);
    }));
    subscription.add(handle);
    subscription
  }
}
