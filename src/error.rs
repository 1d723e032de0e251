//! Error kinds surfaced by the engine, and the process-wide hook that
//! receives errors nobody handled.

use std::{fmt, sync::RwLock, time::Duration};

use once_cell::sync::Lazy;

/// A single-value sequence conversion observed the wrong number of elements.
///
/// Reported by [`as_single`](crate::observable::Observable::as_single) and
/// [`as_maybe`](crate::observable::Observable::as_maybe) at the point the
/// violation is observed: `NoElements` at upstream completion,
/// `TooManyElements` at the offending element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardinalityError {
  #[error("expected exactly one element, got none")]
  NoElements,
  #[error("expected at most one element, got more")]
  TooManyElements,
}

/// The deadline of a [`timeout`](crate::observable::Observable::timeout)
/// elapsed without a next or terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no event within {0:?}")]
pub struct TimeoutError(pub Duration);

/// Handler invoked when a subscription terminates with an error and the
/// subscriber supplied no `on_error` callback.
pub type UnhandledErrorHook = std::sync::Arc<dyn Fn(&dyn fmt::Debug) + Send + Sync>;

static UNHANDLED_ERROR_HOOK: Lazy<RwLock<UnhandledErrorHook>> =
  Lazy::new(|| RwLock::new(std::sync::Arc::new(default_unhandled_error_hook)));

fn default_unhandled_error_hook(err: &dyn fmt::Debug) {
  tracing::error!(?err, "unhandled stream error");
}

/// Replace the process-wide unhandled-error hook, returning the previous one.
///
/// The swap takes effect for subscriptions created afterwards; subscriptions
/// already in flight keep the hook that was current when they were created.
/// There is no implicit reset: callers that install a hook for a test must
/// restore the returned previous hook themselves.
pub fn set_unhandled_error_hook(hook: UnhandledErrorHook) -> UnhandledErrorHook {
  let mut guard = UNHANDLED_ERROR_HOOK
    .write()
    .expect("unhandled-error hook lock poisoned");
  std::mem::replace(&mut *guard, hook)
}

/// Snapshot the current unhandled-error hook.
pub fn unhandled_error_hook() -> UnhandledErrorHook {
  UNHANDLED_ERROR_HOOK
    .read()
    .expect("unhandled-error hook lock poisoned")
    .clone()
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  // One test only: the hook is process-wide state and parallel tests must
  // not race on it.
  #[test]
  fn hook_swap_returns_previous_and_restores() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(String::new()));
    let c = calls.clone();
    let s = seen.clone();
    let previous = set_unhandled_error_hook(Arc::new(move |err| {
      c.fetch_add(1, Ordering::SeqCst);
      *s.lock().unwrap() = format!("{err:?}");
    }));

    unhandled_error_hook()(&CardinalityError::NoElements);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(&*seen.lock().unwrap(), "NoElements");

    set_unhandled_error_hook(previous);
  }
}
