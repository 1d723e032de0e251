use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::BoxObserver;
use crate::sink::Sink;
use crate::subscription::Subscription;

pub struct OfObservable<Item, Err> {
  value: Item,
  _err: PhantomData<fn() -> Err>,
}

/// Emit one value, then complete, synchronously at subscribe time.
pub fn of<Item, Err>(value: Item) -> OfObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  OfObservable { value, _err: PhantomData }
}

impl<Item, Err> Observable for OfObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let sink = Sink::new(observer);
    sink.next(self.value.clone());
    sink.complete();
    Subscription::closed()
  }
}

/// Complete immediately without emitting.
pub fn empty<Item, Err>() -> EmptyObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  EmptyObservable { _marker: PhantomData }
}

pub struct EmptyObservable<Item, Err> {
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<Item, Err> Observable for EmptyObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    Sink::new(observer).complete();
    Subscription::closed()
  }
}

/// Never emit and never terminate.
pub fn never<Item, Err>() -> NeverObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  NeverObservable { _marker: PhantomData }
}

pub struct NeverObservable<Item, Err> {
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<Item, Err> Observable for NeverObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    let sink = Sink::new(observer);
    let subscription = Subscription::new();
    // Keep the observer reachable until the consumer disposes.
    subscription.add(sink);
    subscription
  }
}

/// Error immediately with `err`.
pub fn throw<Item, Err>(err: Err) -> ThrowObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  ThrowObservable { err, _marker: PhantomData }
}

pub struct ThrowObservable<Item, Err> {
  err: Err,
  _marker: PhantomData<fn() -> Item>,
}

impl<Item, Err> Observable for ThrowObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    Sink::new(observer).error(self.err.clone());
    Subscription::closed()
  }
}
