//! Hot multicast nodes.
//!
//! All subject flavors share [`SubjectCore`]: a fan-out list guarded by one
//! lock, an event queue that serializes concurrent and re-entrant emissions
//! (same discipline as [`crate::sink::Sink`]), a latched terminal event
//! replayed to late subscribers, and a per-flavor buffer policy deciding what
//! a new subscriber is caught up with. The core never holds its lock while
//! invoking downstream observers.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::observer::{BoxObserver, Event, Observer};
use crate::subscription::Subscription;

mod async_subject;
mod behavior_subject;
mod publish_subject;
mod replay_subject;

pub use async_subject::AsyncSubject;
pub use behavior_subject::BehaviorSubject;
pub use publish_subject::PublishSubject;
pub use replay_subject::ReplaySubject;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Terminal<Err> {
  Completed,
  Error(Err),
}

/// What a newly registered subscriber is caught up with.
pub(crate) enum BufferPolicy<Item> {
  /// Nothing; subscribers only see events emitted after registration.
  None,
  /// The single most recent value (behavior semantics).
  Latest(Option<Item>),
  /// The last `cap` values, or all of them when `cap` is `None`.
  Replay { cap: Option<usize>, buf: VecDeque<Item> },
  /// Swallow values while live; on completion emit only the final one.
  LastAtCompletion(Option<Item>),
}

struct Entry<Item, Err> {
  observer: BoxObserver<Item, Err>,
}

struct CoreInner<Item, Err> {
  observers: Vec<Entry<Item, Err>>,
  buffer: BufferPolicy<Item>,
  terminal: Option<Terminal<Err>>,
  queue: VecDeque<Event<Item, Err>>,
  emitting: bool,
}

pub(crate) struct SubjectCore<Item, Err> {
  inner: Arc<Mutex<CoreInner<Item, Err>>>,
}

impl<Item, Err> Clone for SubjectCore<Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item, Err> SubjectCore<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub(crate) fn new(buffer: BufferPolicy<Item>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(CoreInner {
        observers: Vec::new(),
        buffer,
        terminal: None,
        queue: VecDeque::new(),
        emitting: false,
      })),
    }
  }

  pub(crate) fn push(&self, event: Event<Item, Err>) {
    {
      let mut inner = self.inner.lock().unwrap();
      if inner.terminal.is_some() {
        return;
      }
      inner.queue.push_back(event);
      if inner.emitting {
        return;
      }
      inner.emitting = true;
    }
    self.drain();
  }

  pub(crate) fn is_terminated(&self) -> bool {
    self.inner.lock().unwrap().terminal.is_some()
  }

  /// Attach an observer: catch it up per the buffer policy, replay a latched
  /// terminal if there is one, and otherwise keep it registered until the
  /// returned subscription is disposed or a terminal arrives.
  pub(crate) fn register(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let catch_up = {
      let inner = self.inner.lock().unwrap();
      let prelude: Vec<Item> = match (&inner.buffer, &inner.terminal) {
        (BufferPolicy::None, _) => Vec::new(),
        (BufferPolicy::Latest(current), None) => current.clone().into_iter().collect(),
        // Behavior semantics: after terminal, only the terminal replays.
        (BufferPolicy::Latest(_), Some(_)) => Vec::new(),
        (BufferPolicy::Replay { buf, .. }, _) => buf.iter().cloned().collect(),
        (BufferPolicy::LastAtCompletion(_), None) => Vec::new(),
        (BufferPolicy::LastAtCompletion(last), Some(Terminal::Completed)) => {
          last.clone().into_iter().collect()
        }
        (BufferPolicy::LastAtCompletion(_), Some(Terminal::Error(_))) => Vec::new(),
      };
      (prelude, inner.terminal.clone())
    };

    let (prelude, terminal) = catch_up;
    let mut sink = crate::sink::Sink::new(observer);
    for value in prelude {
      Observer::next(&mut sink, value);
    }
    match terminal {
      Some(Terminal::Completed) => {
        sink.complete();
        return Subscription::closed();
      }
      Some(Terminal::Error(err)) => {
        sink.error(err);
        return Subscription::closed();
      }
      None => {}
    }

    // Registration races with an in-flight drain are benign: the entry only
    // sees events popped after it lands in the list, and those events are
    // already reflected in the buffer it was caught up from.
    {
      let mut inner = self.inner.lock().unwrap();
      if inner.terminal.is_some() {
        // Terminal arrived between catch-up and registration.
        drop(inner);
        return self.register_terminal_race(sink);
      }
      inner.observers.push(Entry { observer: Box::new(sink.clone()) });
    }

    let subscription = Subscription::new();
    subscription.add(sink);
    subscription
  }

  fn register_terminal_race(&self, sink: crate::sink::Sink<Item, Err>) -> Subscription {
    let terminal = self.inner.lock().unwrap().terminal.clone();
    match terminal {
      Some(Terminal::Completed) => sink.complete(),
      Some(Terminal::Error(err)) => sink.error(err),
      None => {}
    }
    Subscription::closed()
  }

  fn drain(&self) {
    loop {
      let (event, mut observers) = {
        let mut inner = self.inner.lock().unwrap();
        let Some(event) = inner.queue.pop_front() else {
          inner.emitting = false;
          return;
        };
        // Update the buffer and terminal state before fan-out, so a
        // subscriber registering mid-delivery is caught up consistently.
        let event = match event {
          Event::Next(value) => match &mut inner.buffer {
            BufferPolicy::None => Some(Event::Next(value)),
            BufferPolicy::Latest(current) => {
              *current = Some(value.clone());
              Some(Event::Next(value))
            }
            BufferPolicy::Replay { cap, buf } => {
              buf.push_back(value.clone());
              if let Some(cap) = cap {
                while buf.len() > *cap {
                  buf.pop_front();
                }
              }
              Some(Event::Next(value))
            }
            BufferPolicy::LastAtCompletion(last) => {
              *last = Some(value);
              None
            }
          },
          Event::Completed => {
            inner.terminal = Some(Terminal::Completed);
            Some(Event::Completed)
          }
          Event::Error(err) => {
            inner.terminal = Some(Terminal::Error(err.clone()));
            Some(Event::Error(err))
          }
        };
        let Some(event) = event else { continue };
        (event, std::mem::take(&mut inner.observers))
      };

      // Async-subject completion: surface the held value first.
      let final_value = {
        let inner = self.inner.lock().unwrap();
        match (&inner.buffer, &event) {
          (BufferPolicy::LastAtCompletion(last), Event::Completed) => last.clone(),
          _ => None,
        }
      };

      let terminal = !matches!(event, Event::Next(_));
      for entry in &mut observers {
        if let Some(value) = final_value.clone() {
          entry.observer.next(value);
        }
        match event.clone() {
          Event::Next(value) => entry.observer.next(value),
          Event::Error(err) => entry.observer.error(err),
          Event::Completed => entry.observer.complete(),
        }
      }

      let mut inner = self.inner.lock().unwrap();
      if terminal {
        inner.queue.clear();
        inner.emitting = false;
        // Entries registered mid-terminal get the terminal via register's
        // latch check; the delivered set is dropped.
        inner.observers.clear();
        return;
      }
      observers.retain(|entry| !entry.observer.is_stopped());
      // Keep entries that registered during delivery.
      let mut registered = std::mem::take(&mut inner.observers);
      observers.append(&mut registered);
      inner.observers = observers;
    }
  }
}
