use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subject::ReplaySubject;
use crate::subscription::{Subscription, SubscriptionLike};

/// Lifetime of the shared state once a cycle ends, either by the source
/// terminating or by the subscriber count dropping to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareScope {
  /// Drop the replay buffer and any latched terminal when the cycle ends;
  /// the next subscriber starts a fresh cycle against the source.
  WhileConnected,
  /// Keep the buffer and terminal forever. Once the shared stream has
  /// terminated, later subscribers only get the replayed history and the
  /// terminal, without touching the source again.
  Forever,
}

/// Multicasts the source through an internal replay subject with automatic
/// connect and disconnect driven by the subscriber count.
pub struct ShareOp<S: Observable> {
  source: Arc<S>,
  replay: usize,
  scope: ShareScope,
  state: Arc<Mutex<ShareState<S::Item, S::Err>>>,
}

struct ShareState<Item, Err> {
  subject: Option<ReplaySubject<Item, Err>>,
  subscribers: usize,
  connection: Option<Subscription>,
  // Bumped on every reset so an in-flight connect can tell its cycle ended.
  generation: u64,
}

impl<Item, Err> ShareState<Item, Err> {
  fn reset(&mut self) -> Option<Subscription> {
    self.subject = None;
    self.generation += 1;
    self.connection.take()
  }
}

impl<S: Observable> ShareOp<S> {
  pub(crate) fn new(source: S, replay: usize, scope: ShareScope) -> Self {
    Self {
      source: Arc::new(source),
      replay,
      scope,
      state: Arc::new(Mutex::new(ShareState {
        subject: None,
        subscribers: 0,
        connection: None,
        generation: 0,
      })),
    }
  }
}

/// Feeds the source into the cycle's subject and retires the cycle on a
/// terminal when the scope is `WhileConnected`.
struct ShareBridge<Item, Err> {
  subject: ReplaySubject<Item, Err>,
  state: Arc<Mutex<ShareState<Item, Err>>>,
  scope: ShareScope,
}

impl<Item, Err> ShareBridge<Item, Err> {
  fn retire(&self) {
    if self.scope == ShareScope::WhileConnected {
      self.state.lock().unwrap().reset();
    }
  }
}

impl<Item, Err> Observer<Item, Err> for ShareBridge<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { self.subject.next(value); }

  fn error(&mut self, err: Err) {
    self.subject.error(err);
    self.retire();
  }

  fn complete(&mut self) {
    self.subject.complete();
    self.retire();
  }

  fn is_stopped(&self) -> bool { self.subject.is_terminated() }
}

impl<S> Observable for ShareOp<S>
where
  S: Observable,
  S::Item: Clone + Send + Sync,
  S::Err: Clone + Send + Sync,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let (subject, connect, generation) = {
      let mut state = self.state.lock().unwrap();
      let subject = state
        .subject
        .get_or_insert_with(|| ReplaySubject::new(self.replay))
        .clone();
      state.subscribers += 1;
      // A terminated subject only replays; it must not pull on the source
      // again. That is the Forever case after the shared cycle ended.
      let connect = state.connection.is_none() && !subject.is_terminated();
      (subject, connect, state.generation)
    };

    // Register before connecting, so a synchronous source reaches the
    // subscriber that triggered the connection.
    let downstream = subject.subscribe_core(observer);
    let handle = Subscription::new();
    handle.add(downstream);

    let state = self.state.clone();
    let scope = self.scope;
    handle.add_teardown(move || {
      let connection = {
        let mut state = state.lock().unwrap();
        state.subscribers -= 1;
        if state.subscribers > 0 {
          None
        } else if scope == ShareScope::WhileConnected {
          state.reset()
        } else {
          state.connection.take()
        }
      };
      if let Some(mut connection) = connection {
        connection.unsubscribe();
      }
    });

    if connect {
      let bridge = ShareBridge {
        subject,
        state: self.state.clone(),
        scope: self.scope,
      };
      let mut connection = self.source.subscribe_core(Box::new(bridge));
      let mut state = self.state.lock().unwrap();
      if state.generation == generation {
        state.connection = Some(connection);
      } else {
        // The cycle already retired while the source subscribed.
        drop(state);
        connection.unsubscribe();
      }
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;
  use crate::observable::create;
  use crate::observer::Event;

  fn scripted() -> (Arc<AtomicUsize>, impl Observable<Item = i32, Err = ()>) {
    let connects = Arc::new(AtomicUsize::new(0));
    let c = connects.clone();
    let source = create(move |emitter: crate::observable::Emitter<i32, ()>| {
      c.fetch_add(1, Ordering::SeqCst);
      emitter.next(1);
      emitter.next(2);
      emitter.complete();
    });
    (connects, source)
  }

  #[test]
  fn while_connected_restarts_after_last_unsubscribe() {
    let connects = Arc::new(AtomicUsize::new(0));
    let c = connects.clone();
    // Keeps the connection open so the refcount, not the source, ends it.
    let source = create(move |emitter: crate::observable::Emitter<i32, ()>| {
      let n = c.fetch_add(1, Ordering::SeqCst);
      emitter.next(n as i32);
    });
    let shared = source.share(0, ShareScope::WhileConnected);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    shared
      .subscribe(move |v| s.lock().unwrap().push(v))
      .unsubscribe();
    let s = seen.clone();
    shared
      .subscribe(move |v| s.lock().unwrap().push(v))
      .unsubscribe();

    assert_eq!(connects.load(Ordering::SeqCst), 2);
    assert_eq!(&*seen.lock().unwrap(), &[0, 1]);
  }

  #[test]
  fn forever_replays_history_without_reconnecting() {
    let (connects, source) = scripted();
    let shared = source.share(1, ShareScope::Forever);

    let first = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (f1, f2) = (first.clone(), first.clone());
    shared.subscribe_all(
      move |v| f1.lock().unwrap().push(Event::Next(v)),
      |_| {},
      move || f2.lock().unwrap().push(Event::Completed),
    );
    assert_eq!(
      &*first.lock().unwrap(),
      &[Event::Next(1), Event::Next(2), Event::Completed]
    );

    // The cycle is over; the late subscriber gets the buffered tail and the
    // terminal straight from the subject.
    let late = Arc::new(Mutex::new(Vec::<Event<_, ()>>::new()));
    let (l1, l2) = (late.clone(), late.clone());
    shared.subscribe_all(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      |_| {},
      move || l2.lock().unwrap().push(Event::Completed),
    );
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(
      &*late.lock().unwrap(),
      &[Event::Next(2), Event::Completed]
    );
  }

  #[test]
  fn while_connected_forgets_a_finished_cycle() {
    let (connects, source) = scripted();
    let shared = source.share(1, ShareScope::WhileConnected);

    shared.subscribe(|_| {});
    // The first cycle terminated, which retires its subject; the next
    // subscriber starts over instead of replaying.
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    shared.subscribe(move |v| s.lock().unwrap().push(v));

    assert_eq!(connects.load(Ordering::SeqCst), 2);
    assert_eq!(&*seen.lock().unwrap(), &[1, 2]);
  }
}
