use std::{marker::PhantomData, time::Duration};

use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::subscription::Subscription;

pub struct TimerObservable<SD, Err> {
  delay: Duration,
  scheduler: SD,
  _err: PhantomData<fn() -> Err>,
}

/// Emit `()` once after `delay` on `scheduler`, then complete. Disposing
/// before the deadline swallows the emission.
pub fn timer<SD, Err>(delay: Duration, scheduler: SD) -> TimerObservable<SD, Err>
where
  SD: Scheduler,
  Err: Send + 'static,
{
  TimerObservable { delay, scheduler, _err: PhantomData }
}

impl<SD, Err> Observable for TimerObservable<SD, Err>
where
  SD: Scheduler,
  Err: Send + 'static,
{
  type Item = ();
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<(), Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let handle = self.scheduler.schedule_after(
      self.delay,
      Box::new(move || {
        sink.next(());
        sink.complete();
      }),
    );
    subscription.add(handle);
    subscription
  }
}

pub struct IntervalObservable<SD, Err> {
  period: Duration,
  scheduler: SD,
  _err: PhantomData<fn() -> Err>,
}

/// Emit `0, 1, 2, …` every `period` on `scheduler`, forever. Ends only by
/// disposal.
pub fn interval<SD, Err>(period: Duration, scheduler: SD) -> IntervalObservable<SD, Err>
where
  SD: Scheduler,
  Err: Send + 'static,
{
  IntervalObservable { period, scheduler, _err: PhantomData }
}

impl<SD, Err> Observable for IntervalObservable<SD, Err>
where
  SD: Scheduler,
  Err: Send + 'static,
{
  type Item = u64;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<u64, Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let period = self.period;
    let mut count = 0u64;
    // First tick fires one full period after subscribing.
    let handle = self.scheduler.schedule_recursive(move || {
      if count > 0 {
        sink.next(count - 1);
      }
      if sink.is_done() {
        return None;
      }
      count += 1;
      Some(period)
    });
    subscription.add(handle);
    subscription
  }
}
