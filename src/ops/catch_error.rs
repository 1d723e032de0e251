use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::sink::Sink;
use crate::subscription::{SerialSubscription, Subscription};

/// Swaps to a fallback stream when the source errors. The handler inspects
/// the error and either supplies the fallback (`Ok`) or rethrows (`Err`),
/// which forwards that error downstream as the terminal event. Errors from
/// the fallback itself are not caught again.
pub struct CatchErrorOp<S, F> {
  source: S,
  handler: Arc<F>,
}

impl<S, F> CatchErrorOp<S, F> {
  pub(crate) fn new(source: S, handler: F) -> Self {
    Self { source, handler: Arc::new(handler) }
  }
}

struct CatchObserver<T, F>
where
  T: Observable,
{
  sink: Sink<T::Item, T::Err>,
  handler: Arc<F>,
  current: SerialSubscription,
}

impl<T, F> Observer<T::Item, T::Err> for CatchObserver<T, F>
where
  T: Observable,
  F: Fn(T::Err) -> Result<T, T::Err>,
{
  fn next(&mut self, value: T::Item) { self.sink.next(value); }

  fn error(&mut self, err: T::Err) {
    match (*self.handler)(err) {
      Ok(fallback) => {
        let upstream = fallback.subscribe_core(Box::new(self.sink.clone()));
        self.current.swap(upstream);
      }
      Err(rethrown) => self.sink.error(rethrown),
    }
  }

  fn complete(&mut self) { self.sink.complete(); }

  fn is_stopped(&self) -> bool { self.sink.is_done() }
}

impl<S, T, F> Observable for CatchErrorOp<S, F>
where
  S: Observable,
  T: Observable<Item = S::Item, Err = S::Err>,
  F: Fn(S::Err) -> Result<T, S::Err> + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    let subscription = Subscription::new();
    let sink = Sink::new(observer);
    subscription.add(sink.clone());
    let current = SerialSubscription::new();
    subscription.add(current.clone());
    let upstream = self.source.subscribe_core(Box::new(CatchObserver::<T, F> {
      sink,
      handler: self.handler.clone(),
      current,
    }));
    subscription.add(upstream);
    subscription
  }
}
