//! The immutable stream description and the operator surface.
//!
//! An [`Observable`] is a recipe: subscribing runs it for one independent
//! subscription and returns the [`Subscription`] that cancels it. The trait
//! is object-safe through the single [`subscribe_core`](Observable::subscribe_core)
//! capability; every operator is a provided method that wraps `self` in an
//! operator type from [`crate::ops`].

use std::{fmt, sync::Arc, time::Duration};

use crate::error::{CardinalityError, TimeoutError};
use crate::observer::{BoxObserver, CallbackObserver, Observer};
use crate::ops::{
  box_it::BoxObservable,
  catch_error::CatchErrorOp,
  combine_latest::CombineLatestOp,
  concat::ConcatOp,
  delay::DelayOp,
  distinct_until_changed::{DistinctUntilChangedByOp, DistinctUntilChangedOp},
  filter::FilterOp,
  filter_map::FilterMapOp,
  group_by::GroupByOp,
  ignore_elements::IgnoreElementsOp,
  map::MapOp,
  merge::MergeOp,
  merge_all::MergeAllOp,
  observe_on::ObserveOnOp,
  retry::RetryOp,
  retry_when::RetryWhenOp,
  scan::ScanOp,
  share::{ShareOp, ShareScope},
  subscribe_on::SubscribeOnOp,
  switch_on_next::SwitchOnNextOp,
  tap::TapOp,
  timeout::TimeoutOp,
  try_map::TryMapOp,
  zip::ZipOp,
};
use crate::scheduler::Scheduler;
use crate::single::{Completable, Maybe, Single};
use crate::subject::{PublishSubject, ReplaySubject};
use crate::subscription::Subscription;

mod connectable;
mod create;
mod defer;
mod from_iter;
mod of;
mod timer;

pub use connectable::{ConnectableObservable, MulticastWithOp};
pub use create::{Emitter, create};
pub use defer::defer;
pub use from_iter::from_iter;
pub use of::{empty, never, of, throw};
pub use timer::{interval, timer};

pub use crate::ops::combine_latest::combine_latest_all;
pub use crate::ops::concat::concat_all;
pub use crate::ops::zip::zip_all;

/// A push-based stream of `Item`s terminated by at most one `Err` or
/// completion.
pub trait Observable: Send + Sync + 'static {
  type Item: Send + 'static;
  type Err: Send + 'static;

  /// Start one subscription delivering into `observer`.
  ///
  /// Implementations must deliver no event after a terminal one and must
  /// stop promptly once the returned subscription is disposed.
  fn subscribe_core(&self, observer: BoxObserver<Self::Item, Self::Err>) -> Subscription;

  // ---- consumer surface ----

  fn subscribe_with<O>(&self, observer: O) -> Subscription
  where
    Self: Sized,
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    self.subscribe_core(Box::new(observer))
  }

  /// Subscribe with a next callback only; an error terminal goes to the
  /// process-wide unhandled-error hook.
  fn subscribe<N>(&self, next: N) -> Subscription
  where
    Self: Sized,
    Self::Err: fmt::Debug,
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_core(Box::new(CallbackObserver::new(next)))
  }

  fn subscribe_err<N, E>(&self, next: N, error: E) -> Subscription
  where
    Self: Sized,
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
  {
    self.subscribe_core(Box::new(CallbackObserver::with_error(next, error)))
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    Self: Sized,
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_core(Box::new(
      CallbackObserver::with_error(next, error).on_completed(complete),
    ))
  }

  // ---- transforms ----

  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    Self: Sized,
    B: Send + 'static,
    F: Fn(Self::Item) -> B + Send + Sync + 'static,
  {
    MapOp::new(self, f)
  }

  /// Map with a fallible selector; an `Err` return terminates the
  /// subscription with that error.
  fn try_map<B, F>(self, f: F) -> TryMapOp<Self, F>
  where
    Self: Sized,
    B: Send + 'static,
    F: Fn(Self::Item) -> Result<B, Self::Err> + Send + Sync + 'static,
  {
    TryMapOp::new(self, f)
  }

  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    FilterOp::new(self, predicate)
  }

  fn filter_map<B, F>(self, f: F) -> FilterMapOp<Self, F>
  where
    Self: Sized,
    B: Send + 'static,
    F: Fn(Self::Item) -> Option<B> + Send + Sync + 'static,
  {
    FilterMapOp::new(self, f)
  }

  fn scan<B, F>(self, seed: B, accumulator: F) -> ScanOp<Self, B, F>
  where
    Self: Sized,
    B: Clone + Send + Sync + 'static,
    F: Fn(B, Self::Item) -> B + Send + Sync + 'static,
  {
    ScanOp::new(self, seed, accumulator)
  }

  fn distinct_until_changed(self) -> DistinctUntilChangedOp<Self>
  where
    Self: Sized,
    Self::Item: PartialEq + Clone,
  {
    DistinctUntilChangedOp::new(self)
  }

  fn distinct_until_changed_by<K, F>(self, key: F) -> DistinctUntilChangedByOp<Self, F>
  where
    Self: Sized,
    K: PartialEq + Send + 'static,
    F: Fn(&Self::Item) -> K + Send + Sync + 'static,
  {
    DistinctUntilChangedByOp::new(self, key)
  }

  fn ignore_elements(self) -> IgnoreElementsOp<Self>
  where
    Self: Sized,
  {
    IgnoreElementsOp::new(self)
  }

  /// Observe the subscription's lifecycle without altering it. Hooks are
  /// attached with the builder methods on [`TapOp`].
  fn tap(self) -> TapOp<Self>
  where
    Self: Sized,
  {
    TapOp::new(self)
  }

  // ---- time & context ----

  /// Re-deliver every event on `scheduler`. A serial scheduler preserves
  /// element order; disposal swallows scheduled-but-undelivered events.
  fn observe_on<SD>(self, scheduler: SD) -> ObserveOnOp<Self, SD>
  where
    Self: Sized,
    SD: Scheduler,
  {
    ObserveOnOp::new(self, scheduler)
  }

  /// Perform the subscription side effect on `scheduler`.
  fn subscribe_on<SD>(self, scheduler: SD) -> SubscribeOnOp<Self, SD>
  where
    Self: Sized,
    SD: Scheduler,
  {
    SubscribeOnOp::new(self, scheduler)
  }

  /// Shift elements and completion by `delay`; errors pass immediately.
  fn delay<SD>(self, delay: Duration, scheduler: SD) -> DelayOp<Self, SD>
  where
    Self: Sized,
    SD: Scheduler,
  {
    DelayOp::new(self, delay, scheduler)
  }

  /// Error with [`TimeoutError`] when the source stays silent for `window`.
  fn timeout<SD>(self, window: Duration, scheduler: SD) -> TimeoutOp<Self, SD>
  where
    Self: Sized,
    Self::Err: From<TimeoutError>,
    SD: Scheduler,
  {
    TimeoutOp::new(self, window, scheduler)
  }

  // ---- combination ----

  /// Run `self` to completion, then `other`. An error from either
  /// short-circuits.
  fn concat_with<T>(self, other: T) -> ConcatOp<BoxObservable<Self::Item, Self::Err>>
  where
    Self: Sized,
    T: Observable<Item = Self::Item, Err = Self::Err>,
  {
    ConcatOp::new(vec![self.box_it(), other.box_it()])
  }

  fn merge_with<T>(self, other: T) -> MergeOp<Self, T>
  where
    Self: Sized,
    T: Observable<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp::new(self, other)
  }

  /// Flatten a stream of streams, running at most `max_concurrent` inners at
  /// once (0 = unbounded). Overflow inners queue in arrival order.
  fn merge_all(self, max_concurrent: usize) -> MergeAllOp<Self>
  where
    Self: Sized,
    Self::Item: Observable<Err = Self::Err>,
  {
    MergeAllOp::new(self, max_concurrent)
  }

  fn flat_map<C, F>(self, f: F) -> MergeAllOp<MapOp<Self, F>>
  where
    Self: Sized,
    C: Observable<Err = Self::Err>,
    F: Fn(Self::Item) -> C + Send + Sync + 'static,
  {
    self.map(f).merge_all(0)
  }

  /// Combine the latest value of both sources through `f` on every emission
  /// once both have emitted. Completes early when a source completes without
  /// ever emitting.
  fn combine_latest<T, B, F>(self, other: T, f: F) -> CombineLatestOp<Self, T, F>
  where
    Self: Sized,
    Self::Item: Clone,
    T: Observable<Err = Self::Err>,
    T::Item: Clone,
    B: Send + 'static,
    F: Fn(Self::Item, T::Item) -> B + Send + Sync + 'static,
  {
    CombineLatestOp::new(self, other, f)
  }

  /// Pair the n-th element of both sources through `f`.
  fn zip<T, B, F>(self, other: T, f: F) -> ZipOp<Self, T, F>
  where
    Self: Sized,
    T: Observable<Err = Self::Err>,
    B: Send + 'static,
    F: Fn(Self::Item, T::Item) -> B + Send + Sync + 'static,
  {
    ZipOp::new(self, other, f)
  }

  /// Mirror only the most recently emitted inner stream.
  fn switch_on_next(self) -> SwitchOnNextOp<Self>
  where
    Self: Sized,
    Self::Item: Observable<Err = Self::Err>,
  {
    SwitchOnNextOp::new(self)
  }

  fn switch_map<C, F>(self, f: F) -> SwitchOnNextOp<MapOp<Self, F>>
  where
    Self: Sized,
    C: Observable<Err = Self::Err>,
    F: Fn(Self::Item) -> C + Send + Sync + 'static,
  {
    self.map(f).switch_on_next()
  }

  /// Demultiplex into per-key sub-streams.
  fn group_by<K, F>(self, key: F) -> GroupByOp<Self, F>
  where
    Self: Sized,
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    Self::Item: Clone,
    Self::Err: Clone,
    F: Fn(&Self::Item) -> K + Send + Sync + 'static,
  {
    GroupByOp::new(self, key)
  }

  // ---- multicasting ----

  /// Route this source through `subject`; upstream is not subscribed until
  /// [`ConnectableObservable::connect`].
  fn multicast<Sub>(self, subject: Sub) -> ConnectableObservable<Self, Sub>
  where
    Self: Sized,
    Sub: Observable<Item = Self::Item, Err = Self::Err>
      + Observer<Self::Item, Self::Err>
      + Clone
      + Send
      + Sync
      + 'static,
  {
    ConnectableObservable::new(self, subject)
  }

  /// Multicast scoped to a selector: each subscription gets a fresh subject
  /// from `subject_factory`, pipes it through `selector`, and connects the
  /// source for the lifetime of that subscription.
  fn multicast_with<Sub, T, FSub, FSel>(
    self,
    subject_factory: FSub,
    selector: FSel,
  ) -> MulticastWithOp<Self, FSub, FSel>
  where
    Self: Sized,
    Sub: Observable<Item = Self::Item, Err = Self::Err>
      + Observer<Self::Item, Self::Err>
      + Clone
      + Send
      + Sync
      + 'static,
    T: Observable,
    FSub: Fn() -> Sub + Send + Sync + 'static,
    FSel: Fn(Sub) -> T + Send + Sync + 'static,
  {
    MulticastWithOp::new(self, subject_factory, selector)
  }

  fn publish(self) -> ConnectableObservable<Self, PublishSubject<Self::Item, Self::Err>>
  where
    Self: Sized,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    let subject = PublishSubject::new();
    self.multicast(subject)
  }

  /// Multicast through a bounded replay buffer of the last `n` elements.
  fn replay(self, n: usize) -> ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self: Sized,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    let subject = ReplaySubject::new(n);
    self.multicast(subject)
  }

  /// Reference-counted multicast with a replay buffer of `replay` elements.
  /// `scope` controls what survives the refcount reaching zero.
  fn share(self, replay: usize, scope: ShareScope) -> ShareOp<Self>
  where
    Self: Sized,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    ShareOp::new(self, replay, scope)
  }

  // ---- error recovery ----

  /// On error, hand the error to `handler`; `Ok(fallback)` continues with
  /// the fallback stream, `Err(e)` terminates with `e`.
  fn catch_error<T, F>(self, handler: F) -> CatchErrorOp<Self, F>
  where
    Self: Sized,
    T: Observable<Item = Self::Item, Err = Self::Err>,
    F: Fn(Self::Err) -> Result<T, Self::Err> + Send + Sync + 'static,
  {
    CatchErrorOp::new(self, handler)
  }

  /// Resubscribe up to `count` times on error; the last error is forwarded
  /// once the budget is exhausted. `retry(2)` makes at most 3 attempts.
  fn retry(self, count: usize) -> RetryOp<Self>
  where
    Self: Sized,
  {
    RetryOp::new(self, Some(count))
  }

  fn retry_forever(self) -> RetryOp<Self>
  where
    Self: Sized,
  {
    RetryOp::new(self, None)
  }

  /// Resubscribe when `notifier` emits. Upstream errors are fed into the
  /// stream handed to `notifier`; the notifier's own terminal event
  /// terminates the subscription with that event.
  fn retry_when<N, F>(self, notifier: F) -> RetryWhenOp<Self, F>
  where
    Self: Sized,
    Self::Err: Clone,
    N: Observable<Err = Self::Err>,
    F: Fn(PublishSubject<Self::Err, Self::Err>) -> N + Send + Sync + 'static,
  {
    RetryWhenOp::new(self, notifier)
  }

  // ---- single-value views ----

  /// Assert this stream emits exactly one element.
  fn as_single(self) -> Single<Self>
  where
    Self: Sized,
    Self::Err: From<CardinalityError>,
  {
    Single::new(self)
  }

  /// Assert this stream emits at most one element.
  fn as_maybe(self) -> Maybe<Self>
  where
    Self: Sized,
    Self::Err: From<CardinalityError>,
  {
    Maybe::new(self)
  }

  /// Keep only the terminal event.
  fn as_completable(self) -> Completable<IgnoreElementsOp<Self>>
  where
    Self: Sized,
  {
    Completable::new(self.ignore_elements())
  }

  // ---- erasure ----

  fn box_it(self) -> BoxObservable<Self::Item, Self::Err>
  where
    Self: Sized,
  {
    Arc::new(self)
  }
}

impl<O> Observable for Arc<O>
where
  O: Observable + ?Sized,
{
  type Item = O::Item;
  type Err = O::Err;

  fn subscribe_core(&self, observer: BoxObserver<Self::Item, Self::Err>) -> Subscription {
    (**self).subscribe_core(observer)
  }
}
