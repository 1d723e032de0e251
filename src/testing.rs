//! Deterministic stream testing against the virtual clock.
//!
//! [`TestObserver`] records every received event together with the logical
//! time it arrived. [`ColdObservable`] plays a script relative to each
//! subscription; [`HotObservable`] plays a script at absolute times into a
//! shared subject. Both log when they were subscribed and unsubscribed, so
//! timing assertions can cover the subscription lifecycle itself.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Event, Observer};
use crate::scheduler::{Scheduler, VirtualScheduler};
use crate::sink::Sink;
use crate::subject::PublishSubject;
use crate::subscription::Subscription;

/// When a scripted source was subscribed and, if it has been, unsubscribed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribed_at: Duration,
  pub unsubscribed_at: Option<Duration>,
}

/// Records `(virtual time, event)` pairs as they arrive.
pub struct TestObserver<Item, Err> {
  scheduler: VirtualScheduler,
  records: Arc<Mutex<Vec<(Duration, Event<Item, Err>)>>>,
  done: Arc<AtomicBool>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      records: self.records.clone(),
      done: self.done.clone(),
    }
  }
}

impl<Item, Err> TestObserver<Item, Err> {
  pub fn new(scheduler: VirtualScheduler) -> Self {
    Self {
      scheduler,
      records: Arc::new(Mutex::new(Vec::new())),
      done: Arc::new(AtomicBool::new(false)),
    }
  }

  fn record(&self, event: Event<Item, Err>) {
    self
      .records
      .lock()
      .unwrap()
      .push((self.scheduler.now(), event));
  }
}

impl<Item: Clone, Err: Clone> TestObserver<Item, Err> {
  /// Everything received so far, stamped with arrival time.
  pub fn records(&self) -> Vec<(Duration, Event<Item, Err>)> {
    self.records.lock().unwrap().clone()
  }

  /// The received events without their timestamps.
  pub fn events(&self) -> Vec<Event<Item, Err>> {
    self
      .records
      .lock()
      .unwrap()
      .iter()
      .map(|(_, event)| event.clone())
      .collect()
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.record(Event::Next(value)); }

  fn error(&mut self, err: Err) {
    self.done.store(true, Ordering::Release);
    self.record(Event::Error(err));
  }

  fn complete(&mut self) {
    self.done.store(true, Ordering::Release);
    self.record(Event::Completed);
  }

  fn is_stopped(&self) -> bool { self.done.load(Ordering::Acquire) }
}

/// A scripted source that replays its script for every subscriber, with
/// event times relative to the moment of subscription.
pub struct ColdObservable<Item, Err> {
  scheduler: VirtualScheduler,
  script: Arc<Vec<(Duration, Event<Item, Err>)>>,
  logs: Arc<Mutex<Vec<SubscriptionLog>>>,
}

impl<Item, Err> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      script: self.script.clone(),
      logs: self.logs.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn new(scheduler: VirtualScheduler, script: Vec<(Duration, Event<Item, Err>)>) -> Self {
    Self {
      scheduler,
      script: Arc::new(script),
      logs: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// Subscription lifecycles observed so far, in subscription order.
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> {
    self.logs.lock().unwrap().clone()
  }
}

fn log_subscribe(
  logs: &Arc<Mutex<Vec<SubscriptionLog>>>,
  scheduler: &VirtualScheduler,
  subscription: &Subscription,
) {
  let slot = {
    let mut logs = logs.lock().unwrap();
    logs.push(SubscriptionLog {
      subscribed_at: scheduler.now(),
      unsubscribed_at: None,
    });
    logs.len() - 1
  };
  let logs = logs.clone();
  let scheduler = scheduler.clone();
  subscription.add_teardown(move || {
    let mut logs = logs.lock().unwrap();
    if let Some(log) = logs.get_mut(slot) {
      if log.unsubscribed_at.is_none() {
        log.unsubscribed_at = Some(scheduler.now());
      }
    }
  });
}

impl<Item, Err> Observable for ColdObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let sink = Sink::new(observer);
    let subscription = Subscription::new();
    subscription.add(sink.clone());
    log_subscribe(&self.logs, &self.scheduler, &subscription);
    for (offset, event) in self.script.iter() {
      let sink = sink.clone();
      let event = event.clone();
      let handle = self.scheduler.schedule_after(
        *offset,
        Box::new(move || match event {
          Event::Next(value) => sink.next(value),
          Event::Error(err) => sink.error(err),
          Event::Completed => sink.complete(),
        }),
      );
      subscription.add(handle);
    }
    subscription
  }
}

/// A scripted source that emits at absolute virtual times whether or not
/// anyone is listening; subscribers share one live timeline.
pub struct HotObservable<Item, Err> {
  scheduler: VirtualScheduler,
  subject: PublishSubject<Item, Err>,
  logs: Arc<Mutex<Vec<SubscriptionLog>>>,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      subject: self.subject.clone(),
      logs: self.logs.clone(),
    }
  }
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(scheduler: VirtualScheduler, script: Vec<(Duration, Event<Item, Err>)>) -> Self {
    let subject = PublishSubject::new();
    let now = scheduler.now();
    for (at, event) in script {
      let subject = subject.clone();
      scheduler.schedule_after(
        at.saturating_sub(now),
        Box::new(move || match event {
          Event::Next(value) => subject.next(value),
          Event::Error(err) => subject.error(err),
          Event::Completed => subject.complete(),
        }),
      );
    }
    Self {
      scheduler,
      subject,
      logs: Arc::new(Mutex::new(Vec::new())),
    }
  }

  pub fn subscriptions(&self) -> Vec<SubscriptionLog> {
    self.logs.lock().unwrap().clone()
  }
}

impl<Item, Err> Observable for HotObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let subscription = self.subject.subscribe_core(observer);
    log_subscribe(&self.logs, &self.scheduler, &subscription);
    subscription
  }
}
