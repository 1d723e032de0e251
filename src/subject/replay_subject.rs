use std::collections::VecDeque;

use crate::observable::Observable;
use crate::observer::{BoxObserver, Event, Observer};
use crate::subject::{BufferPolicy, SubjectCore};
use crate::subscription::Subscription;

/// Buffers the last `n` (or all) elements and replays them synchronously, in
/// original order, to every new subscriber before live events. After a
/// terminal event the buffer and the terminal both replay.
pub struct ReplaySubject<Item, Err> {
  core: SubjectCore<Item, Err>,
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Keep the last `buffer_size` elements. `new(0)` degenerates to publish
  /// behavior.
  pub fn new(buffer_size: usize) -> Self {
    Self {
      core: SubjectCore::new(BufferPolicy::Replay {
        cap: Some(buffer_size),
        buf: VecDeque::new(),
      }),
    }
  }

  /// Keep every element.
  pub fn unbounded() -> Self {
    Self { core: SubjectCore::new(BufferPolicy::Replay { cap: None, buf: VecDeque::new() }) }
  }

  pub fn next(&self, value: Item) { self.core.push(Event::Next(value)); }

  pub fn error(&self, err: Err) { self.core.push(Event::Error(err)); }

  pub fn complete(&self) { self.core.push(Event::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }
}

impl<Item, Err> Observable for ReplaySubject<Item, Err>
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

impl<Item, Err> Observer<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { ReplaySubject::next(self, value) }

  fn error(&mut self, err: Err) { ReplaySubject::error(self, err) }

  fn complete(&mut self) { ReplaySubject::complete(self) }

  fn is_stopped(&self) -> bool { self.is_terminated() }
}
