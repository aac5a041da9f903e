//! Lock utils.
//!
//! The core owns its document, node tree, and surfaces on a single task (see
//! `crate::evloop`); these macros exist only for the data structures the document
//! shares with the diagnostics listener, which reads (never mutates) under a timeout
//! so a stuck client can never wedge the render loop.

use std::time::Duration;

/// Default timeout for [`rlock!`]/[`wlock!`].
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Alias to `($id).try_read_for(LOCK_TIMEOUT).unwrap()`.
#[macro_export]
macro_rules! rlock {
  ($id:expr) => {
    ($id)
      .try_read_for($crate::locks::LOCK_TIMEOUT)
      .expect("hex1b_core: read lock timed out")
  };
}

/// Alias to `($id).try_write_for(LOCK_TIMEOUT).unwrap()`.
#[macro_export]
macro_rules! wlock {
  ($id:expr) => {
    ($id)
      .try_write_for($crate::locks::LOCK_TIMEOUT)
      .expect("hex1b_core: write lock timed out")
  };
}
