use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::ops::ref_count::RefCountOp;
use crate::subscription::Subscription;

/// A multicast pipeline whose upstream is subscribed explicitly.
///
/// Subscribers attach to the inner subject at any time; nothing flows from
/// the source until [`connect`](Self::connect). Disposing the subscription
/// `connect` returns detaches the upstream while leaving subscribers on the
/// subject.
pub struct ConnectableObservable<S, Sub> {
  source: Arc<S>,
  subject: Sub,
}

impl<S, Sub: Clone> Clone for ConnectableObservable<S, Sub> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), subject: self.subject.clone() }
  }
}

impl<S, Sub> ConnectableObservable<S, Sub>
where
  S: Observable,
  Sub: Observable<Item = S::Item, Err = S::Err>
    + Observer<S::Item, S::Err>
    + Clone
    + Send
    + Sync
    + 'static,
{
  pub(crate) fn new(source: S, subject: Sub) -> Self {
    Self { source: Arc::new(source), subject }
  }

  /// Subscribe the subject to the upstream source.
  pub fn connect(&self) -> Subscription {
    self.source.subscribe_core(Box::new(self.subject.clone()))
  }

  /// Connect on the first subscriber, disconnect when the last leaves.
  pub fn ref_count(self) -> RefCountOp<S, Sub> {
    RefCountOp::new(self.source, self.subject)
  }
}

impl<S, Sub> Observable for ConnectableObservable<S, Sub>
where
  S: Observable,
  Sub: Observable<Item = S::Item, Err = S::Err>
    + Observer<S::Item, S::Err>
    + Clone
    + Send
    + Sync
    + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    self.subject.subscribe_core(observer)
  }
}

/// Multicast scoped to a selector pipeline: each subscription gets its own
/// subject from the factory, runs the selector over it, and connects the
/// source for exactly the lifetime of that subscription.
pub struct MulticastWithOp<S, FSub, FSel> {
  source: Arc<S>,
  subject_factory: Arc<FSub>,
  selector: Arc<FSel>,
}

impl<S, FSub, FSel> MulticastWithOp<S, FSub, FSel> {
  pub(crate) fn new(source: S, subject_factory: FSub, selector: FSel) -> Self {
    Self {
      source: Arc::new(source),
      subject_factory: Arc::new(subject_factory),
      selector: Arc::new(selector),
    }
  }
}

impl<S, Sub, T, FSub, FSel> Observable for MulticastWithOp<S, FSub, FSel>
where
  S: Observable,
  Sub: Observable<Item = S::Item, Err = S::Err>
    + Observer<S::Item, S::Err>
    + Clone
    + Send
    + Sync
    + 'static,
  T: Observable,
  FSub: Fn() -> Sub + Send + Sync + 'static,
  FSel: Fn(Sub) -> T + Send + Sync + 'static,
{
  type Item = T::Item;
  type Err = T::Err;

  fn subscribe_core(&self, observer: BoxObserver<T::Item, T::Err>) -> Subscription {
    let subject = (*self.subject_factory)();
    let pipeline = (*self.selector)(subject.clone());
    let handle = Subscription::new();
    // The selector output is subscribed before the source connects, so a
    // synchronous source flows into an already-listening pipeline.
    handle.add(pipeline.subscribe_core(observer));
    handle.add(self.source.subscribe_core(Box::new(subject)));
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::from_iter;
  use crate::subscription::SubscriptionLike;

  #[test]
  fn nothing_flows_before_connect() {
    let connectable = from_iter::<_, ()>(vec![1, 2]).publish();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    connectable.subscribe(move |v| s.lock().unwrap().push(v));

    assert!(seen.lock().unwrap().is_empty());
    connectable.connect();
    assert_eq!(&*seen.lock().unwrap(), &[1, 2]);
  }

  #[test]
  fn multicast_with_connects_the_source_once_per_subscription() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let connects = Arc::new(AtomicUsize::new(0));
    let c = connects.clone();
    let source = crate::observable::create(move |emitter: crate::observable::Emitter<i32, ()>| {
      c.fetch_add(1, Ordering::SeqCst);
      emitter.next(1);
      emitter.next(2);
      emitter.complete();
    });

    // The selector consumes the subject twice, yet the source is subscribed
    // exactly once for the whole pipeline.
    let paired = source.multicast_with(
      || crate::subject::PublishSubject::<i32, ()>::new(),
      |subject: crate::subject::PublishSubject<i32, ()>| {
        subject.clone().combine_latest(subject, |a, b| (a, b))
      },
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    paired.subscribe(move |pair| s.lock().unwrap().push(pair));

    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(&*seen.lock().unwrap(), &[(1, 1), (2, 1), (2, 2)]);
  }

  #[test]
  fn disconnect_detaches_upstream_only() {
    let subject = crate::subject::PublishSubject::<i32, ()>::new();
    let connectable = crate::observable::never::<i32, ()>().multicast(subject.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let downstream = connectable.subscribe(move |v| s.lock().unwrap().push(v));

    let mut connection = connectable.connect();
    connection.unsubscribe();

    // Subscribers stay attached to the subject after disconnect.
    assert!(!downstream.is_closed());
    subject.next(1);
    assert_eq!(&*seen.lock().unwrap(), &[1]);
  }
}
