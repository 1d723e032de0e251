use std::time::Duration;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Shifts elements and completion forward in time. Errors are not delayed;
/// a failed stream reports as soon as the failure is known.
pub struct DelayOp<S, SD> {
  source: S,
  delay: Duration,
  scheduler: SD,
}

impl<S, SD> DelayOp<S, SD> {
  pub(crate) fn new(source: S, delay: Duration, scheduler: SD) -> Self {
    Self { source, delay, scheduler }
  }
}

struct DelayObserver<Item, Err, SD> {
  sink: Sink<Item, Err>,
  delay: Duration,
  scheduler: SD,
  subscription: Subscription,
}

impl<Item, Err, SD> Observer<Item, Err> for DelayObserver<Item, Err, SD>
where
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    let sink = self.sink.clone();
    let handle = self
      .scheduler
      .schedule_after(self.delay, Box::new(move || sink.next(value)));
    self.subscription.add(handle);
  }

  fn error(&mut self, err: Err) { self.sink.error(err); }

  fn complete(&mut self) {
    let sink = self.sink.clone();
    let handle = self
      .scheduler
      .schedule_after(self.delay, Box::new(move || sink.complete()));
    self.subscription.add(handle);
  }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<S, SD> Observable for DelayOp<S, SD>
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
    let upstream = self.source.subscribe_core(Box::new(DelayObserver {
      sink,
      delay: self.delay,
      scheduler: self.scheduler.clone(),
      subscription: subscription.clone(),
    }));
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
  use crate::scheduler::VirtualScheduler;
  use crate::subject::PublishSubject;

  #[test]
  fn elements_and_completion_shift_by_the_delay() {
    let scheduler = VirtualScheduler::new();
    let log = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, ()>(1..=2)
      .delay(Duration::from_millis(10), scheduler.clone())
      .subscribe_all(
        move |v| l1.lock().unwrap().push(Event::Next(v)),
        |_| {},
        move || l2.lock().unwrap().push(Event::Completed),
      );

    scheduler.advance_by(Duration::from_millis(9));
    assert!(log.lock().unwrap().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Next(1), Event::Next(2), Event::Completed]
    );
  }

  #[test]
  fn errors_are_not_delayed() {
    let scheduler = VirtualScheduler::new();
    let subject = PublishSubject::<i32, &'static str>::new();
    let errs = Arc::new(Mutex::new(Vec::new()));
    let e = errs.clone();
    subject
      .clone()
      .delay(Duration::from_millis(50), scheduler.clone())
      .subscribe_err(|_| {}, move |err| e.lock().unwrap().push(err));

    subject.error("boom");
    // No clock advance needed.
    assert_eq!(&*errs.lock().unwrap(), &["boom"]);
  }
}
