use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::{BoxObserver, Observer};
use crate::subscription::{Subscription, SubscriptionLike};

/// Automatic connection management for a multicast pipeline: the upstream is
/// connected when the subscriber count goes 0 to 1 and disconnected when it
/// drops back to 0. A later subscriber connects afresh.
pub struct RefCountOp<S, Sub> {
  source: Arc<S>,
  subject: Sub,
  state: Arc<Mutex<RcState>>,
}

struct RcState {
  subscribers: usize,
  connection: Option<Subscription>,
}

impl<S, Sub> RefCountOp<S, Sub> {
  pub(crate) fn new(source: Arc<S>, subject: Sub) -> Self {
    Self {
      source,
      subject,
      state: Arc::new(Mutex::new(RcState { subscribers: 0, connection: None })),
    }
  }
}

impl<S, Sub> Observable for RefCountOp<S, Sub>
where
  S: Observable,
  Sub: Observable<Item = S::Item, Err = S::Err>
    + Observer<S::Item, S::Err>
    + Clone
    + Send
    + Sync
    + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn subscribe_core(&self, observer: BoxObserver<S::Item, S::Err>) -> Subscription {
    // Register downstream before connecting, so a synchronously completing
    // upstream still reaches the subscriber that caused the connection.
    let downstream = self.subject.subscribe_core(observer);
    let handle = Subscription::new();
    handle.add(downstream);

    let state = self.state.clone();
    handle.add_teardown(move || {
      let connection = {
        let mut state = state.lock().unwrap();
        state.subscribers -= 1;
        if state.subscribers == 0 { state.connection.take() } else { None }
      };
      if let Some(mut connection) = connection {
        connection.unsubscribe();
      }
    });

    let connect = {
      let mut state = self.state.lock().unwrap();
      state.subscribers += 1;
      state.subscribers == 1 && state.connection.is_none()
    };
    if connect {
      let connection = self.source.subscribe_core(Box::new(self.subject.clone()));
      self.state.lock().unwrap().connection = Some(connection);
    }
    handle
  }
}
