//! Restricted single-value views over a stream.
//!
//! [`Single`], [`Maybe`] and [`Completable`] narrow the subscribe surface to
//! the callbacks that can actually fire, and enforce the element-count
//! contract at runtime. Violations surface through the stream's own error
//! channel as [`CardinalityError`] values.

use crate::error::CardinalityError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{Subscription, SubscriptionLike};

/// A stream asserted to emit exactly one element and then complete.
///
/// Anything else is a contract violation: completion without an element
/// errors with [`CardinalityError::NoElements`], a second element errors
/// with [`CardinalityError::TooManyElements`] and disposes the upstream at
/// that element.
pub struct Single<S> {
  source: S,
}

impl<S> Single<S>
where
  S: Observable,
  S::Err: From<CardinalityError>,
{
  pub(crate) fn new(source: S) -> Self { Self { source } }

  pub fn subscribe<N, E>(&self, on_success: N, on_error: E) -> Subscription
  where
    N: FnOnce(S::Item) + Send + 'static,
    E: FnOnce(S::Err) + Send + 'static,
  {
    let handle = Subscription::new();
    let upstream = self.source.subscribe_core(Box::new(CountingObserver {
      held: None,
      on_value: Some(on_success),
      on_empty: OnEmpty::<fn()>::Error,
      on_error: Some(on_error),
      done: false,
      handle: handle.clone(),
    }));
    handle.add(upstream);
    handle
  }
}

/// A stream asserted to emit at most one element.
///
/// One element resolves as success, none as plain completion; a second
/// element errors with [`CardinalityError::TooManyElements`] and disposes
/// the upstream at that element.
pub struct Maybe<S> {
  source: S,
}

impl<S> Maybe<S>
where
  S: Observable,
  S::Err: From<CardinalityError>,
{
  pub(crate) fn new(source: S) -> Self { Self { source } }

  pub fn subscribe<N, E>(&self, on_success: N, on_error: E) -> Subscription
  where
    N: FnOnce(S::Item) + Send + 'static,
    E: FnOnce(S::Err) + Send + 'static,
  {
    self.subscribe_all(on_success, on_error, || {})
  }

  pub fn subscribe_all<N, E, C>(&self, on_success: N, on_error: E, on_completed: C) -> Subscription
  where
    N: FnOnce(S::Item) + Send + 'static,
    E: FnOnce(S::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    let handle = Subscription::new();
    let upstream = self.source.subscribe_core(Box::new(CountingObserver {
      held: None,
      on_value: Some(on_success),
      on_empty: OnEmpty::Complete(Some(on_completed)),
      on_error: Some(on_error),
      done: false,
      handle: handle.clone(),
    }));
    handle.add(upstream);
    handle
  }
}

/// A stream observed only for its terminal event.
pub struct Completable<S> {
  source: S,
}

impl<S: Observable> Completable<S> {
  pub(crate) fn new(source: S) -> Self { Self { source } }

  pub fn subscribe<C, E>(&self, on_completed: C, on_error: E) -> Subscription
  where
    C: FnOnce() + Send + 'static,
    E: FnOnce(S::Err) + Send + 'static,
  {
    self
      .source
      .subscribe_core(Box::new(TerminalObserver {
        on_completed: Some(on_completed),
        on_error: Some(on_error),
        done: false,
      }))
  }
}

enum OnEmpty<C> {
  /// Completing without an element is a violation (`Single`).
  Error,
  /// Completing without an element is a plain completion (`Maybe`).
  Complete(Option<C>),
}

struct CountingObserver<Item, N, E, C> {
  held: Option<Item>,
  on_value: Option<N>,
  on_empty: OnEmpty<C>,
  on_error: Option<E>,
  done: bool,
  handle: Subscription,
}

impl<Item, Err, N, E, C> Observer<Item, Err> for CountingObserver<Item, N, E, C>
where
  Item: Send + 'static,
  Err: From<CardinalityError> + Send + 'static,
  N: FnOnce(Item) + Send + 'static,
  E: FnOnce(Err) + Send + 'static,
  C: FnOnce() + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.done {
      return;
    }
    if self.held.is_none() {
      self.held = Some(value);
      return;
    }
    self.done = true;
    if let Some(on_error) = self.on_error.take() {
      on_error(CardinalityError::TooManyElements.into());
    }
    self.handle.unsubscribe();
  }

  fn error(&mut self, err: Err) {
    if self.done {
      return;
    }
    self.done = true;
    if let Some(on_error) = self.on_error.take() {
      on_error(err);
    }
  }

  fn complete(&mut self) {
    if self.done {
      return;
    }
    self.done = true;
    match self.held.take() {
      Some(value) => {
        if let Some(on_value) = self.on_value.take() {
          on_value(value);
        }
      }
      None => match &mut self.on_empty {
        OnEmpty::Error => {
          if let Some(on_error) = self.on_error.take() {
            on_error(CardinalityError::NoElements.into());
          }
        }
        OnEmpty::Complete(on_completed) => {
          if let Some(on_completed) = on_completed.take() {
            on_completed();
          }
        }
      },
    }
  }

  fn is_stopped(&self) -> bool { self.done }
}

struct TerminalObserver<C, E> {
  on_completed: Option<C>,
  on_error: Option<E>,
  done: bool,
}

impl<Item, Err, C, E> Observer<Item, Err> for TerminalObserver<C, E>
where
  C: FnOnce() + Send + 'static,
  E: FnOnce(Err) + Send + 'static,
{
  fn next(&mut self, _value: Item) {}

  fn error(&mut self, err: Err) {
    if self.done {
      return;
    }
    self.done = true;
    if let Some(on_error) = self.on_error.take() {
      on_error(err);
    }
  }

  fn complete(&mut self) {
    if self.done {
      return;
    }
    self.done = true;
    if let Some(on_completed) = self.on_completed.take() {
      on_completed();
    }
  }

  fn is_stopped(&self) -> bool { self.done }
}
