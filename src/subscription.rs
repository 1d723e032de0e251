//! Disposal handles.
//!
//! Every `subscribe` returns a [`Subscription`]. Disposing it is idempotent,
//! thread-safe, and releases everything the chain registered: upstream
//! subscriptions, scheduled tasks, teardown closures.

use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

/// Anything that can be disposed exactly once.
pub trait SubscriptionLike: Send {
  /// Dispose. Calling again is a no-op.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

type Teardown = Box<dyn SubscriptionLike + Send>;

#[derive(Default)]
struct Inner {
  closed: bool,
  teardown: SmallVec<[Teardown; 1]>,
}

/// The composite disposal handle returned by every subscribe.
///
/// Cloneable; all clones share the same state. Registering a resource on an
/// already-disposed composite disposes that resource immediately instead of
/// leaking it.
#[derive(Clone, Default)]
pub struct Subscription {
  inner: Arc<Mutex<Inner>>,
}

impl Subscription {
  pub fn new() -> Self { Self::default() }

  /// A composite that is already closed.
  pub fn closed() -> Self {
    let s = Self::new();
    s.inner.lock().unwrap().closed = true;
    s
  }

  /// Register a resource to dispose together with this subscription.
  pub fn add<S: SubscriptionLike + 'static>(&self, subscription: S) {
    let mut boxed: Teardown = Box::new(subscription);
    let mut inner = self.inner.lock().unwrap();
    if inner.closed {
      drop(inner);
      boxed.unsubscribe();
      return;
    }
    // Drop entries that closed on their own so long-lived composites
    // (interval consumers, subjects) don't grow without bound.
    inner.teardown.retain(|t| !t.is_closed());
    inner.teardown.push(boxed);
  }

  /// Register a closure to run on disposal.
  pub fn add_teardown<F: FnOnce() + Send + 'static>(&self, f: F) {
    self.add(TeardownFn(Some(f)));
  }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&mut self) {
    let teardown = {
      let mut inner = self.inner.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    // Run teardown outside the lock; a teardown may itself touch this
    // composite (re-entrant dispose is a no-op by then).
    for mut t in teardown {
      t.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().unwrap().closed }
}

struct TeardownFn<F>(Option<F>);

impl<F: FnOnce() + Send> SubscriptionLike for TeardownFn<F> {
  fn unsubscribe(&mut self) {
    if let Some(f) = self.0.take() {
      f();
    }
  }

  fn is_closed(&self) -> bool { self.0.is_none() }
}

enum SingleState {
  Empty,
  Set(Teardown),
  Closed,
}

/// Holds at most one inner subscription, assigned after creation.
///
/// Used where the handle must exist before the resource it will own does
/// (scheduling a task that produces its own cancellation handle). Assigning
/// twice is a caller-contract violation.
#[derive(Clone)]
pub struct SingleAssignmentSubscription {
  state: Arc<Mutex<SingleState>>,
}

impl Default for SingleAssignmentSubscription {
  fn default() -> Self {
    Self { state: Arc::new(Mutex::new(SingleState::Empty)) }
  }
}

impl SingleAssignmentSubscription {
  pub fn new() -> Self { Self::default() }

  /// Assign the inner subscription. If this handle was already disposed the
  /// inner is disposed immediately.
  ///
  /// # Panics
  /// Panics if an inner was already assigned.
  pub fn set<S: SubscriptionLike + 'static>(&self, subscription: S) {
    let mut boxed: Teardown = Box::new(subscription);
    let mut state = self.state.lock().unwrap();
    match &*state {
      SingleState::Empty => *state = SingleState::Set(boxed),
      SingleState::Closed => {
        drop(state);
        boxed.unsubscribe();
      }
      SingleState::Set(_) => panic!("SingleAssignmentSubscription assigned twice"),
    }
  }
}

impl SubscriptionLike for SingleAssignmentSubscription {
  fn unsubscribe(&mut self) {
    let prev = {
      let mut state = self.state.lock().unwrap();
      std::mem::replace(&mut *state, SingleState::Closed)
    };
    if let SingleState::Set(mut inner) = prev {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    matches!(&*self.state.lock().unwrap(), SingleState::Closed)
  }
}

struct SerialInner {
  closed: bool,
  current: Option<Teardown>,
}

/// Holds one inner subscription at a time; swapping in a replacement disposes
/// the previous inner. Used by switch, timeout and retry, where the active
/// upstream changes over the subscription's lifetime.
#[derive(Clone)]
pub struct SerialSubscription {
  inner: Arc<Mutex<SerialInner>>,
}

impl Default for SerialSubscription {
  fn default() -> Self {
    Self { inner: Arc::new(Mutex::new(SerialInner { closed: false, current: None })) }
  }
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  /// Replace the current inner, disposing the one it displaces. If this
  /// handle is already closed the replacement is disposed immediately.
  pub fn swap<S: SubscriptionLike + 'static>(&self, subscription: S) {
    let boxed: Teardown = Box::new(subscription);
    let displaced = {
      let mut inner = self.inner.lock().unwrap();
      if inner.closed {
        Some(boxed)
      } else {
        inner.current.replace(boxed)
      }
    };
    if let Some(mut displaced) = displaced {
      displaced.unsubscribe();
    }
  }
}

impl SubscriptionLike for SerialSubscription {
  fn unsubscribe(&mut self) {
    let current = {
      let mut inner = self.inner.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.current.take()
    };
    if let Some(mut current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().unwrap().closed }
}

struct RefCountInner {
  handles: usize,
  inner: Option<Teardown>,
}

/// Disposes its inner exactly once, when the last outstanding handle is
/// disposed, regardless of the order handles are disposed in.
pub struct RefCountSubscription {
  state: Arc<Mutex<RefCountInner>>,
}

impl RefCountSubscription {
  pub fn new<S: SubscriptionLike + 'static>(inner: S) -> Self {
    Self {
      state: Arc::new(Mutex::new(RefCountInner {
        handles: 0,
        inner: Some(Box::new(inner)),
      })),
    }
  }

  pub fn handle(&self) -> RefCountHandle {
    self.state.lock().unwrap().handles += 1;
    RefCountHandle { state: self.state.clone(), disposed: false }
  }
}

pub struct RefCountHandle {
  state: Arc<Mutex<RefCountInner>>,
  disposed: bool,
}

impl SubscriptionLike for RefCountHandle {
  fn unsubscribe(&mut self) {
    if self.disposed {
      return;
    }
    self.disposed = true;
    let inner = {
      let mut state = self.state.lock().unwrap();
      state.handles -= 1;
      if state.handles == 0 { state.inner.take() } else { None }
    };
    if let Some(mut inner) = inner {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.disposed }
}
