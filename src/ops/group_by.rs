use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Arc, Mutex},
};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::Subscription;

/// Demultiplexes a stream into per-key sub-streams.
///
/// The first element of each distinct key creates a [`GroupedObservable`]
/// which is emitted on the outer stream before the element is delivered into
/// it. Groups terminate together with the outer stream; disposing the outer
/// subscription tears down every group, subscribed or not.
pub struct GroupByOp<S, F> {
  source: S,
  key: Arc<F>,
}

impl<S, F> GroupByOp<S, F> {
  pub(crate) fn new(source: S, key: F) -> Self {
    Self { source, key: Arc::new(key) }
  }
}

/// One key's sub-stream. Hot: elements arriving while nobody is subscribed
/// to the group are dropped.
pub struct GroupedObservable<K, Item, Err> {
  key: K,
  subject: crate::subject::PublishSubject<Item, Err>,
}

impl<K: Clone, Item, Err> Clone for GroupedObservable<K, Item, Err> {
  fn clone(&self) -> Self {
    Self { key: self.key.clone(), subject: self.subject.clone() }
  }
}

impl<K, Item, Err> GroupedObservable<K, Item, Err> {
  pub fn key(&self) -> &K { &self.key }
}

impl<K, Item, Err> Observable for GroupedObservable<K, Item, Err>
where
  K: Clone + Send + Sync + 'static,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    self.subject.subscribe_core(observer)
  }
}

type GroupMap<K, Item, Err> = Arc<Mutex<HashMap<K, crate::subject::PublishSubject<Item, Err>>>>;

struct GroupByObserver<K, Item, Err, F> {
  sink: Sink<GroupedObservable<K, Item, Err>, Err>,
  groups: GroupMap<K, Item, Err>,
  key: Arc<F>,
}

impl<K, Item, Err, F> Observer<Item, Err> for GroupByObserver<K, Item, Err, F>
where
  K: Hash + Eq + Clone + Send + Sync + 'static,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  F: Fn(&Item) -> K,
{
  fn next(&mut self, value: Item) {
    let key = (*self.key)(&value);
    let (subject, fresh) = {
      let mut groups = self.groups.lock().unwrap();
      match groups.get(&key) {
        Some(subject) => (subject.clone(), false),
        None => {
          let subject = crate::subject::PublishSubject::new();
          groups.insert(key.clone(), subject.clone());
          (subject, true)
        }
      }
    };
    if fresh {
      self.sink.next(GroupedObservable { key, subject: subject.clone() });
    }
    subject.next(value);
  }

  fn error(&mut self, err: Err) {
    let groups: Vec<_> = self.groups.lock().unwrap().values().cloned().collect();
    for group in groups {
      group.error(err.clone());
    }
    self.sink.error(err);
  }

  fn complete(&mut self) {
    let groups: Vec<_> = self.groups.lock().unwrap().values().cloned().collect();
    for group in groups {
      group.complete();
    }
    self.sink.complete();
  }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<S, K, F> Observable for GroupByOp<S, F>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  K: Hash + Eq + Clone + Send + Sync + 'static,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
{
  type Item = GroupedObservable<K, S::Item, S::Err>;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<Self::Item, Self::Err>) -> Subscription {
    let sink = Sink::new(observer);
    let groups: GroupMap<K, S::Item, S::Err> = Arc::new(Mutex::new(HashMap::new()));
    let subscription = Subscription::new();
    subscription.add(sink.clone());
    {
      let groups = groups.clone();
      subscription.add_teardown(move || groups.lock().unwrap().clear());
    }
    let upstream = self.source.subscribe_core(Box::new(GroupByObserver {
      sink,
      groups,
      key: self.key.clone(),
    }));
    subscription.add(upstream);
    subscription
  }
}
