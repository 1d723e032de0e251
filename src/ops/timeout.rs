use std::time::Duration;

use crate::error::TimeoutError;
use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::subscription::{SerialSubscription, Subscription, SubscriptionLike};

/// Errors with [`TimeoutError`] when the source stays silent for the whole
/// window. The watchdog re-arms on every element; an element arriving in
/// time disposes the pending timer before it can fire.
pub struct TimeoutOp<S, SD> {
  source: S,
  window: Duration,
  scheduler: SD,
}

impl<S, SD> TimeoutOp<S, SD> {
  pub(crate) fn new(source: S, window: Duration, scheduler: SD) -> Self {
    Self { source, window, scheduler }
  }
}

struct TimeoutObserver<Item, Err, SD: Scheduler> {
  sink: Sink<Item, Err>,
  timer: SerialSubscription,
  window: Duration,
  scheduler: SD,
  subscription: Subscription,
}

impl<Item, Err, SD> TimeoutObserver<Item, Err, SD>
where
  Item: Send + 'static,
  Err: From<TimeoutError> + Send + 'static,
  SD: Scheduler,
{
  fn arm(&self) {
    let sink = self.sink.clone();
    let window = self.window;
    let subscription = self.subscription.clone();
    let handle = self.scheduler.schedule_after(
      window,
      Box::new(move || {
        sink.error(TimeoutError(window).into());
        // Tear down the now-pointless upstream.
        subscription.clone().unsubscribe();
      }),
    );
    self.timer.swap(handle);
  }
}

impl<Item, Err, SD> Observer<Item, Err> for TimeoutObserver<Item, Err, SD>
where
  Item: Send + 'static,
  Err: From<TimeoutError> + Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    self.sink.next(value);
    if !self.sink.is_done() {
      self.arm();
    }
  }

  fn error(&mut self, err: Err) {
    self.timer.clone().unsubscribe();
    self.sink.error(err);
  }

  fn complete(&mut self) {
    self.timer.clone().unsubscribe();
    self.sink.complete();
  }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<S, SD> Observable for TimeoutOp<S, SD>
where
  S: Observable,
  S::Err: From<TimeoutError>,
  SD: Scheduler,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let timer = SerialSubscription::new();
    subscription.add(timer.clone());
    let timeout_observer = TimeoutObserver {
      sink,
      timer,
      window: self.window,
      scheduler: self.scheduler.clone(),
      subscription: subscription.clone(),
    };
    // Arm before subscribing so a source that never produces still times out.
    timeout_observer.arm();
    let upstream = self.source.subscribe_core(Box::new(timeout_observer));
    subscription.add(upstream);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::Event;
  use crate::scheduler::VirtualScheduler;
  use crate::subject::PublishSubject;

  #[derive(Clone, Debug, PartialEq)]
  enum TestErr {
    Timeout(Duration),
  }

  impl From<TimeoutError> for TestErr {
    fn from(err: TimeoutError) -> Self { TestErr::Timeout(err.0) }
  }

  fn run(advance_between: Duration) -> Arc<Mutex<Vec<Event<i32, TestErr>>>> {
    let scheduler = VirtualScheduler::new();
    let subject = PublishSubject::<i32, TestErr>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    subject
      .clone()
      .timeout(Duration::from_millis(20), scheduler.clone())
      .subscribe_err(
        move |v| l1.lock().unwrap().push(Event::Next(v)),
        move |e| l2.lock().unwrap().push(Event::Error(e)),
      );

    for v in 1..=2 {
      scheduler.advance_by(advance_between);
      subject.next(v);
    }
    scheduler.advance_by(Duration::from_millis(30));
    log
  }

  #[test]
  fn timely_elements_keep_the_stream_alive_until_silence() {
    let log = run(Duration::from_millis(10));
    assert_eq!(
      &*log.lock().unwrap(),
      &[
        Event::Next(1),
        Event::Next(2),
        Event::Error(TestErr::Timeout(Duration::from_millis(20))),
      ]
    );
  }

  #[test]
  fn silent_source_errors_at_the_deadline() {
    let log = run(Duration::from_millis(25));
    assert_eq!(
      &*log.lock().unwrap(),
      &[Event::Error(TestErr::Timeout(Duration::from_millis(20)))]
    );
  }
}
