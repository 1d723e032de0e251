use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::Subscription;

type ItemHook<Item> = Arc<dyn Fn(&Item) + Send + Sync>;
type ErrHook<Err> = Arc<dyn Fn(&Err) + Send + Sync>;
type UnitHook = Arc<dyn Fn() + Send + Sync>;

/// Side-effect hooks observing a subscription without altering it. Built
/// with [`Observable::tap`] and the `on_*` builder methods; every hook is
/// independently optional.
///
/// Hook order for one subscription: `on_subscribe`, then per-event hooks
/// before the event is forwarded, then `on_dispose`, with `on_subscribed`
/// after the subscription call returns. A synchronous source therefore
/// reports its terminal hook before `on_subscribed`.
pub struct TapOp<S: Observable> {
  source: S,
  on_next: Option<ItemHook<S::Item>>,
  on_error: Option<ErrHook<S::Err>>,
  on_completed: Option<UnitHook>,
  on_subscribe: Option<UnitHook>,
  on_subscribed: Option<UnitHook>,
  on_dispose: Option<UnitHook>,
}

impl<S: Observable> TapOp<S> {
  pub(crate) fn new(source: S) -> Self {
    Self {
      source,
      on_next: None,
      on_error: None,
      on_completed: None,
      on_subscribe: None,
      on_subscribed: None,
      on_dispose: None,
    }
  }

  pub fn on_next<F: Fn(&S::Item) + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_next = Some(Arc::new(f));
    self
  }

  pub fn on_error<F: Fn(&S::Err) + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_error = Some(Arc::new(f));
    self
  }

  pub fn on_completed<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_completed = Some(Arc::new(f));
    self
  }

  /// Fires before the upstream subscription is made.
  pub fn on_subscribe<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_subscribe = Some(Arc::new(f));
    self
  }

  /// Fires after the upstream subscription call returns.
  pub fn on_subscribed<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_subscribed = Some(Arc::new(f));
    self
  }

  /// Fires when the subscription is disposed, whether by terminal event or
  /// by the consumer.
  pub fn on_dispose<F: Fn() + Send + Sync + 'static>(mut self, f: F) -> Self {
    self.on_dispose = Some(Arc::new(f));
    self
  }
}

struct TapObserver<O, Item, Err> {
  observer: O,
  on_next: Option<ItemHook<Item>>,
  on_error: Option<ErrHook<Err>>,
  on_completed: Option<UnitHook>,
}

impl<Item, Err, O> Observer<Item, Err> for TapObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(hook) = &self.on_next {
      hook(&value);
    }
    self.observer.next(value);
  }

  fn error(&mut self, err: Err) {
    if let Some(hook) = &self.on_error {
      hook(&err);
    }
    self.observer.error(err);
  }

  fn complete(&mut self) {
    if let Some(hook) = &self.on_completed {
      hook();
    }
    self.observer.complete();
  }

  fn is_stopped(&self) -> bool { self.observer.is_stopped() }
}

impl<S> Observable for TapOp<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    if let Some(hook) = &self.on_subscribe {
      hook();
    }
    let subscription = self.source.subscribe_core(Box::new(TapObserver {
      observer,
      on_next: self.on_next.clone(),
      on_error: self.on_error.clone(),
      on_completed: self.on_completed.clone(),
    }));
    if let Some(hook) = &self.on_dispose {
      let hook = hook.clone();
      subscription.add_teardown(move || hook());
    }
    if let Some(hook) = &self.on_subscribed {
      hook();
    }
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::{from_iter, never};
  use crate::subscription::SubscriptionLike;

  #[test]
  fn hooks_fire_in_lifecycle_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let push = |log: &Arc<Mutex<Vec<String>>>, tag: &'static str| {
      let log = log.clone();
      move || log.lock().unwrap().push(tag.to_string())
    };

    let l = log.clone();
    from_iter::<_, ()>(1..=2)
      .tap()
      .on_subscribe(push(&log, "subscribe"))
      .on_next(move |v| l.lock().unwrap().push(format!("next {v}")))
      .on_completed(push(&log, "completed"))
      .on_subscribed(push(&log, "subscribed"))
      .on_dispose(push(&log, "dispose"))
      .subscribe(|_| {});

    // Synchronous source: terminal and dispose report before on_subscribed.
    assert_eq!(
      &*log.lock().unwrap(),
      &["subscribe", "next 1", "next 2", "completed", "dispose", "subscribed"]
    );
  }

  #[test]
  fn dispose_hook_fires_on_manual_dispose() {
    let disposed = Arc::new(Mutex::new(false));
    let d = disposed.clone();
    let mut subscription = never::<i32, ()>()
      .tap()
      .on_dispose(move || *d.lock().unwrap() = true)
      .subscribe(|_| {});

    assert!(!*disposed.lock().unwrap());
    subscription.unsubscribe();
    assert!(*disposed.lock().unwrap());
  }
}
