//! Re-exports of the commonly used surface.

pub use crate::error::{
  CardinalityError, TimeoutError, UnhandledErrorHook, set_unhandled_error_hook,
  unhandled_error_hook,
};
pub use crate::observable;
pub use crate::observable::{
  ConnectableObservable, Emitter, Observable, combine_latest_all, concat_all, create, defer,
  empty, from_iter, interval, never, of, throw, timer, zip_all,
};
pub use crate::observer::{BoxObserver, CallbackObserver, Event, Observer};
pub use crate::ops::box_it::BoxObservable;
pub use crate::ops::share::ShareScope;
pub use crate::scheduler::{
  EventLoopScheduler, ImmediateScheduler, NewThreadScheduler, PoolScheduler, Scheduler, Task,
  TaskHandle, VirtualScheduler,
};
pub use crate::single::{Completable, Maybe, Single};
pub use crate::subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};
pub use crate::subscription::{
  RefCountSubscription, SerialSubscription, SingleAssignmentSubscription, Subscription,
  SubscriptionLike,
};
