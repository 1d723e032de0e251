//! Type-erased observable handle.

use std::sync::Arc;

use crate::observable::Observable;

/// A cloneable, type-erased observable. Produced by
/// [`Observable::box_it`]; operator chains over heterogeneous sources
/// (concat lists, fallback streams) exchange these.
pub type BoxObservable<Item, Err> = Arc<dyn Observable<Item = Item, Err = Err>>;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::of;

  #[test]
  fn boxed_chain_still_composes() {
    let boxed: BoxObservable<i32, ()> = of(1).map(|v| v + 1).box_it();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let s = seen.clone();
    // Arc<dyn Observable> is itself an Observable.
    boxed.clone().map(|v| v * 10).subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(&*seen.lock().unwrap(), &[20]);
  }
}
