use crate::observable::Observable;
use crate::observer::{BoxObserver, Event, Observer};
use crate::subject::{BufferPolicy, SubjectCore};
use crate::subscription::Subscription;

/// Holds a current value; every subscriber first receives it, then live
/// events. After a terminal event only the terminal replays.
pub struct BehaviorSubject<Item, Err> {
  core: SubjectCore<Item, Err>,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self {
    Self { core: SubjectCore::new(BufferPolicy::Latest(Some(initial))) }
  }

  pub fn next(&self, value: Item) { self.core.push(Event::Next(value)); }

  pub fn error(&self, err: Err) { self.core.push(Event::Error(err)); }

  pub fn complete(&self) { self.core.push(Event::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }
}

impl<Item, Err> Observable for BehaviorSubject<Item, Err>
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

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { BehaviorSubject::next(self, value) }

  fn error(&mut self, err: Err) { BehaviorSubject::error(self, err) }

  fn complete(&mut self) { BehaviorSubject::complete(self) }

  fn is_stopped(&self) -> bool { self.is_terminated() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn subscriber_receives_current_value_first() {
    let subject = BehaviorSubject::<i32, ()>::new(0);
    subject.next(1);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    subject.clone().subscribe(move |v| s.lock().unwrap().push(v));
    subject.next(2);

    assert_eq!(&*seen.lock().unwrap(), &[1, 2]);
  }

  #[test]
  fn after_completion_only_the_terminal_replays() {
    let subject = BehaviorSubject::<i32, ()>::new(0);
    subject.next(5);
    subject.complete();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let (s, c) = (seen.clone(), completed.clone());
    subject.clone().subscribe_all(
      move |v| s.lock().unwrap().push(v),
      |_| {},
      move || *c.lock().unwrap() = true,
    );

    assert!(seen.lock().unwrap().is_empty());
    assert!(*completed.lock().unwrap());
  }
}
