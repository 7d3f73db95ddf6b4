//! Cooperative cancellation.
//!
//! The pipeline is single-threaded and sequential; every loop over records
//! polls a [`CancelFlag`] between iterations. Cancellation stops further
//! processing but never rolls back writes already committed.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

/// A cheaply clonable cancellation signal.
///
/// Clones share the same underlying flag; cancelling any clone cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  pub fn new() -> Self { Self::default() }

  /// Request cancellation. Idempotent.
  pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

  pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let flag = CancelFlag::new();
    let other = flag.clone();
    assert!(!other.is_cancelled());

    flag.cancel();
    assert!(other.is_cancelled());
  }
}
