use crate::observable::Observable;
use crate::observer::{BoxObserver, Event, Observer};
use crate::subject::{BufferPolicy, SubjectCore};
use crate::subscription::Subscription;

/// Multicasts live events to current subscribers; late subscribers see only
/// what is emitted after they attach (plus a latched terminal).
pub struct PublishSubject<Item, Err> {
  core: SubjectCore<Item, Err>,
}

impl<Item, Err> Clone for PublishSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item, Err> PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { Self { core: SubjectCore::new(BufferPolicy::None) } }

  pub fn next(&self, value: Item) { self.core.push(Event::Next(value)); }

  pub fn error(&self, err: Err) { self.core.push(Event::Error(err)); }

  pub fn complete(&self) { self.core.push(Event::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }
}

impl<Item, Err> Observable for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe_core(&self, observer: BoxObserver<Item, Err>) -> Subscription {
    self.core.register(observer)
  }
}

impl<Item, Err> Observer<Item, Err> for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { PublishSubject::next(self, value) }

  fn error(&mut self, err: Err) { PublishSubject::error(self, err) }

  fn complete(&mut self) { PublishSubject::complete(self) }

  fn is_stopped(&self) -> bool { self.is_terminated() }
}
