//! Cross-operator timing scenarios driven by the virtual clock.

use std::time::Duration;

use rivulet::prelude::*;
use rivulet::testing::{ColdObservable, TestObserver};

fn ms(v: u64) -> Duration {
  Duration::from_millis(v)
}

#[test]
fn concat_subscribes_the_second_source_only_after_the_first_completes() {
  let scheduler = VirtualScheduler::new();
  let a = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(20), Event::Next(2)),
      (ms(30), Event::Completed),
    ],
  );
  let b = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![(ms(10), Event::Next(3)), (ms(20), Event::Completed)],
  );

  let observer = TestObserver::new(scheduler.clone());
  a.concat_with(b.clone()).subscribe_with(observer.clone());
  scheduler.advance_by(ms(100));

  assert_eq!(b.subscriptions()[0].subscribed_at, ms(30));
  assert_eq!(
    observer.records(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(20), Event::Next(2)),
      (ms(40), Event::Next(3)),
      (ms(50), Event::Completed),
    ]
  );
}

#[test]
fn merge_all_with_one_slot_degenerates_to_concat() {
  let scheduler = VirtualScheduler::new();
  let a = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![(ms(10), Event::Next(1)), (ms(30), Event::Completed)],
  );
  let b = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![(ms(10), Event::Next(2)), (ms(20), Event::Completed)],
  );

  let observer = TestObserver::new(scheduler.clone());
  from_iter::<_, ()>(vec![a.clone().box_it(), b.clone().box_it()])
    .merge_all(1)
    .subscribe_with(observer.clone());
  scheduler.advance_by(ms(100));

  // `b` is parked until `a` frees the only slot.
  assert_eq!(b.subscriptions()[0].subscribed_at, ms(30));
  assert_eq!(
    observer.records(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(40), Event::Next(2)),
      (ms(50), Event::Completed),
    ]
  );
}

#[test]
fn combine_latest_completes_once_a_source_finishes_without_emitting() {
  let scheduler = VirtualScheduler::new();
  let silent = ColdObservable::<i32, ()>::new(scheduler.clone(), vec![(ms(5), Event::Completed)]);
  let values = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![(ms(10), Event::Next(1)), (ms(50), Event::Completed)],
  );

  let observer = TestObserver::new(scheduler.clone());
  values
    .combine_latest(silent, |a, b| a + b)
    .subscribe_with(observer.clone());
  scheduler.advance_by(ms(100));

  // No pair can ever form, so the output closes at the silent completion.
  assert_eq!(observer.records(), vec![(ms(5), Event::Completed)]);
}

#[test]
fn combine_latest_pairs_latest_values_and_waits_for_both_completions() {
  let scheduler = VirtualScheduler::new();
  let a = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(30), Event::Next(2)),
      (ms(40), Event::Completed),
    ],
  );
  let b = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![(ms(20), Event::Next(10)), (ms(50), Event::Completed)],
  );

  let observer = TestObserver::new(scheduler.clone());
  a.combine_latest(b, |a, b| a + b)
    .subscribe_with(observer.clone());
  scheduler.advance_by(ms(100));

  assert_eq!(
    observer.records(),
    vec![
      (ms(20), Event::Next(11)),
      (ms(30), Event::Next(12)),
      (ms(50), Event::Completed),
    ]
  );
}

#[test]
fn a_misbehaving_producer_cannot_emit_past_a_terminal() {
  let scheduler = VirtualScheduler::new();
  let source = ColdObservable::<i32, ()>::new(
    scheduler.clone(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(20), Event::Completed),
      (ms(30), Event::Next(2)),
      (ms(40), Event::Error(())),
    ],
  );

  let observer = TestObserver::new(scheduler.clone());
  let mut subscription = source.subscribe_with(observer.clone());
  scheduler.advance_by(ms(100));

  assert_eq!(
    observer.records(),
    vec![(ms(10), Event::Next(1)), (ms(20), Event::Completed)]
  );

  // Disposing is idempotent, before and after the terminal.
  subscription.unsubscribe();
  subscription.unsubscribe();
  assert!(subscription.is_closed());
}

#[test]
fn timeout_errors_exactly_one_window_after_the_last_event() {
  let scheduler = VirtualScheduler::new();
  let source = ColdObservable::<i32, TimeoutError>::new(
    scheduler.clone(),
    vec![(ms(10), Event::Next(1)), (ms(100), Event::Next(2))],
  );

  let observer = TestObserver::new(scheduler.clone());
  source
    .timeout(ms(50), scheduler.clone())
    .subscribe_with(observer.clone());
  scheduler.advance_by(ms(200));

  assert_eq!(
    observer.records(),
    vec![
      (ms(10), Event::Next(1)),
      (ms(60), Event::Error(TimeoutError(ms(50)))),
    ]
  );
}
