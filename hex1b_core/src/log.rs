//! Logging utils.
//!
//! `RSVIM_LOG`-style env-var driven file logging, adapted to `tracing`: the core never
//! logs to stdout/stderr directly since those belong to the presentation adapter.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Env var controlling the log level, mirrors the teacher's `RSVIM_LOG`.
pub const LOG_ENV_VAR: &str = "HEX1B_LOG";

/// Initializes non-blocking file logging rooted at `dir`. The returned [`WorkerGuard`]
/// must be kept alive for the duration of the process; dropping it flushes and stops
/// the background writer.
pub fn init(dir: impl AsRef<Path>, file_name_prefix: &str) -> WorkerGuard {
  let file_appender = tracing_appender::rolling::never(dir, file_name_prefix);
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("error"));

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(non_blocking)
    .with_ansi(false)
    .with_target(true)
    .init();

  guard
}

#[cfg(test)]
pub(crate) mod test_support {
  use std::sync::Once;
  use tracing_subscriber::EnvFilter;

  static INIT: Once = Once::new();

  /// Initializes a test-only subscriber once per process; safe to call from every test.
  pub fn init_test() {
    INIT.call_once(|| {
      let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_test_writer()
        .try_init();
    });
  }
}
