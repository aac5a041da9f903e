//! Results and errors.

use thiserror::Error as ThisError;

/// [`anyhow::Error`]
pub type AnyErr = anyhow::Error;

/// [`anyhow::Result`] with `T` if ok, [`AnyErr`] if error.
pub type AnyResult<T> = anyhow::Result<T>;

#[derive(Debug, Clone, ThisError)]
/// Error taxonomy shared by the document and TUI cores.
///
/// `Corruption` is the only variant whose constructors are expected to abort the
/// session rather than be matched on: a piece-tree invariant failure is a programmer
/// error, not a recoverable condition.
pub enum Error {
  #[error("out of range: {0}")]
  OutOfRange(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("internal invariant violated: {0}")]
  Corruption(&'static str),

  #[error("transient failure: {0}")]
  Transient(String),

  #[error("cancelled")]
  Cancelled,
}

impl Error {
  pub fn out_of_range(msg: impl Into<String>) -> Self {
    Error::OutOfRange(msg.into())
  }

  pub fn invalid_argument(msg: impl Into<String>) -> Self {
    Error::InvalidArgument(msg.into())
  }

  pub fn invalid_state(msg: impl Into<String>) -> Self {
    Error::InvalidState(msg.into())
  }

  /// Aborts the process. Piece-tree corruption is never recoverable: continuing would
  /// silently serve wrong bytes to every downstream reader.
  pub fn abort_on_corruption(invariant: &'static str) -> ! {
    tracing::error!(invariant, "piece-tree invariant violated, aborting");
    panic!("hex1b_core: corruption: {invariant}");
  }
}

/// [`std::result::Result`] with `T` if ok, [`Error`] if error.
pub type Result<T> = std::result::Result<T, Error>;
