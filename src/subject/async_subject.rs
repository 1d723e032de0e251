use crate::observable::Observable;
use crate::observer::{BoxObserver, Event, Observer};
use crate::subject::{BufferPolicy, SubjectCore};
use crate::subscription::Subscription;

/// Emits nothing until completion, then delivers only the final value (if
/// any) followed by completion. Errors discard the held value.
pub struct AsyncSubject<Item, Err> {
  core: SubjectCore<Item, Err>,
}

impl<Item, Err> Clone for AsyncSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for AsyncSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item, Err> AsyncSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self {
    Self { core: SubjectCore::new(BufferPolicy::LastAtCompletion(None)) }
  }

  pub fn next(&self, value: Item) { self.core.push(Event::Next(value)); }

  pub fn error(&self, err: Err) { self.core.push(Event::Error(err)); }

  pub fn complete(&self) { self.core.push(Event::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }
}

impl<Item, Err> Observable for AsyncSubject<Item, Err>
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

impl<Item, Err> Observer<Item, Err> for AsyncSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { AsyncSubject::next(self, value) }

  fn error(&mut self, err: Err) { AsyncSubject::error(self, err) }

  fn complete(&mut self) { AsyncSubject::complete(self) }

  fn is_stopped(&self) -> bool { self.is_terminated() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observer::Event;

  fn recorded(subject: &AsyncSubject<i32, &'static str>) -> Arc<Mutex<Vec<Event<i32, &'static str>>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject.clone().subscribe_all(
      move |v| l1.lock().unwrap().push(Event::Next(v)),
      move |e| l2.lock().unwrap().push(Event::Error(e)),
      move || l3.lock().unwrap().push(Event::Completed),
    );
    log
  }

  #[test]
  fn only_final_value_is_delivered_at_completion() {
    let subject = AsyncSubject::<i32, &'static str>::new();
    let log = recorded(&subject);

    subject.next(1);
    subject.next(2);
    assert!(log.lock().unwrap().is_empty());
    subject.complete();

    assert_eq!(&*log.lock().unwrap(), &[Event::Next(2), Event::Completed]);
  }

  #[test]
  fn late_subscriber_gets_final_value_too() {
    let subject = AsyncSubject::<i32, &'static str>::new();
    subject.next(9);
    subject.complete();
    let log = recorded(&subject);
    assert_eq!(&*log.lock().unwrap(), &[Event::Next(9), Event::Completed]);
  }

  #[test]
  fn error_discards_held_value() {
    let subject = AsyncSubject::<i32, &'static str>::new();
    subject.next(9);
    subject.error("boom");
    let log = recorded(&subject);
    assert_eq!(&*log.lock().unwrap(), &[Event::Error("boom")]);
  }

  #[test]
  fn completion_without_value_completes_only() {
    let subject = AsyncSubject::<i32, &'static str>::new();
    subject.complete();
    let log = recorded(&subject);
    assert_eq!(&*log.lock().unwrap(), &[Event::Completed]);
  }
}
