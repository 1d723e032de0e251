//! The delivery latch shared by operators and subjects.
//!
//! A [`Sink`] wraps the downstream observer behind a lock and enforces the
//! terminal-event invariant: after one `error` or `complete` (or after
//! [`Sink::detach`]) every further event is dropped. Concurrent producers are
//! serialized through an event queue drained by whichever caller holds the
//! emitting flag, so events never interleave mid-delivery and a re-entrant
//! emission from inside a downstream callback is deferred instead of
//! deadlocking.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::observer::{BoxObserver, Event, Observer};
use crate::subscription::SubscriptionLike;

struct SinkInner<Item, Err> {
  // None while a drain is delivering to it outside the lock, and after
  // detach. `done` stays the source of truth for the latch.
  observer: Option<BoxObserver<Item, Err>>,
  done: bool,
  queue: VecDeque<Event<Item, Err>>,
  emitting: bool,
  // Runs once, outside the lock, when the sink latches done through event
  // delivery. Dropped without running on detach: disposal is already
  // releasing resources through the owning subscription.
  terminal_hook: Option<Box<dyn FnOnce() + Send>>,
}

pub struct Sink<Item, Err> {
  inner: Arc<Mutex<SinkInner<Item, Err>>>,
}

impl<Item, Err> Clone for Sink<Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item, Err> Sink<Item, Err> {
  pub fn new(observer: BoxObserver<Item, Err>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(SinkInner {
        observer: Some(observer),
        done: false,
        queue: VecDeque::new(),
        emitting: false,
        terminal_hook: None,
      })),
    }
  }

  /// Release resources tied to the subscription when the stream ends on its
  /// own, without waiting for the consumer to dispose.
  pub fn on_terminal<F: FnOnce() + Send + 'static>(&self, hook: F) {
    let mut inner = self.inner.lock().unwrap();
    if inner.done {
      drop(inner);
      hook();
    } else {
      inner.terminal_hook = Some(Box::new(hook));
    }
  }

  pub fn next(&self, value: Item) { self.push(Event::Next(value)); }

  pub fn error(&self, err: Err) { self.push(Event::Error(err)); }

  pub fn complete(&self) { self.push(Event::Completed); }

  pub fn is_done(&self) -> bool { self.inner.lock().unwrap().done }

  /// Drop the downstream observer without delivering a terminal event.
  /// Called on disposal so downstream state is released promptly.
  pub fn detach(&self) {
    let mut inner = self.inner.lock().unwrap();
    inner.done = true;
    inner.queue.clear();
    inner.observer = None;
    inner.terminal_hook = None;
  }

  fn push(&self, event: Event<Item, Err>) {
    {
      let mut inner = self.inner.lock().unwrap();
      if inner.done {
        return;
      }
      inner.queue.push_back(event);
      if inner.emitting {
        // Another caller (or an outer frame of this thread) is draining;
        // it will pick this event up.
        return;
      }
      inner.emitting = true;
    }
    self.drain();
  }

  fn drain(&self) {
    loop {
      let (event, mut observer) = {
        let mut inner = self.inner.lock().unwrap();
        match inner.queue.pop_front() {
          Some(event) => {
            let terminal = !matches!(event, Event::Next(_));
            if terminal {
              inner.done = true;
              inner.queue.clear();
            }
            match inner.observer.take() {
              Some(observer) => (event, observer),
              None => {
                inner.emitting = false;
                return;
              }
            }
          }
          None => {
            inner.emitting = false;
            return;
          }
        }
      };
      // Deliver outside the lock. The downstream may re-enter this sink;
      // such events land in the queue and are drained by this loop.
      let terminal = !matches!(event, Event::Next(_));
      match event {
        Event::Next(value) => observer.next(value),
        Event::Error(err) => observer.error(err),
        Event::Completed => observer.complete(),
      }
      // A downstream that latched its own stop (operator-side early exit)
      // closes this sink too, so synchronous sources stop emitting.
      let stopped = observer.is_stopped();
      let mut inner = self.inner.lock().unwrap();
      if terminal || stopped || inner.done {
        inner.done = true;
        inner.observer = None;
        inner.queue.clear();
        inner.emitting = false;
        let hook = inner.terminal_hook.take();
        drop(inner);
        if let Some(hook) = hook {
          hook();
        }
        return;
      }
      if inner.observer.is_none() {
        inner.observer = Some(observer);
      }
    }
  }
}

impl<Item, Err> Observer<Item, Err> for Sink<Item, Err> {
  fn next(&mut self, value: Item) { Sink::next(self, value) }

  fn error(&mut self, err: Err) { Sink::error(self, err) }

  fn complete(&mut self) { Sink::complete(self) }

  fn is_stopped(&self) -> bool { self.is_done() }
}

impl<Item, Err> SubscriptionLike for Sink<Item, Err>
where
  Item: Send,
  Err: Send,
{
  fn unsubscribe(&mut self) { self.detach() }

  fn is_closed(&self) -> bool { self.is_done() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::CallbackObserver;

  fn recording_sink() -> (Sink<i32, &'static str>, Arc<Mutex<Vec<Event<i32, &'static str>>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l1 = log.clone();
    let l2 = log.clone();
    let observer = CallbackObserver::with_error(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      move |e| l2.lock().unwrap().push(Event::Error(e)),
    );
    let l3 = log.clone();
    let observer = observer.on_completed(move || l3.lock().unwrap().push(Event::Completed));
    (Sink::new(Box::new(observer)), log)
  }

  #[test]
  fn suppresses_events_after_terminal() {
    let (sink, log) = recording_sink();
    sink.next(1);
    sink.complete();
    sink.next(2);
    sink.error("late");
    sink.complete();

    assert_eq!(&*log.lock().unwrap(), &[Event::Next(1), Event::Completed]);
  }

  #[test]
  fn detach_drops_everything_silently() {
    let (sink, log) = recording_sink();
    sink.next(1);
    sink.detach();
    sink.next(2);
    sink.complete();

    assert_eq!(&*log.lock().unwrap(), &[Event::Next(1)]);
    assert!(sink.is_done());
  }

  #[test]
  fn terminal_hook_fires_on_terminal_but_not_on_detach() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let fired = Arc::new(AtomicUsize::new(0));
    let (sink, _log) = recording_sink();
    let f = fired.clone();
    sink.on_terminal(move || {
      f.fetch_add(1, Ordering::SeqCst);
    });
    sink.next(1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    sink.complete();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let detached = Arc::new(AtomicUsize::new(0));
    let (sink, _log) = recording_sink();
    let d = detached.clone();
    sink.on_terminal(move || {
      d.fetch_add(1, Ordering::SeqCst);
    });
    sink.detach();
    assert_eq!(detached.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn reentrant_emission_is_queued_not_interleaved() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<Mutex<Option<Sink<i32, &'static str>>>> = Arc::new(Mutex::new(None));

    let l = log.clone();
    let s = slot.clone();
    let observer = CallbackObserver::<i32, &'static str>::new(move |v| {
      l.lock().unwrap().push(v);
      if v == 1 {
        // Emit from inside the callback; must be delivered after this
        // frame returns, not recursively.
        let sink = s.lock().unwrap().clone().unwrap();
        sink.next(10);
        l.lock().unwrap().push(-1); // marker: callback frame still running
      }
    });
    let sink = Sink::new(Box::new(observer) as BoxObserver<i32, &'static str>);
    *slot.lock().unwrap() = Some(sink.clone());

    sink.next(1);
    assert_eq!(&*log.lock().unwrap(), &[1, -1, 10]);
  }
}
