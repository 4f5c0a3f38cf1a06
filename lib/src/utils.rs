#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::{
  subscriber::{self, DefaultGuard, SetGlobalDefaultError},
  Level,
};

#[cfg(debug_assertions)]
extern crate better_panic;

// [NOTE] tracing
//
// Epoch progress and evaluation results go out at `info`, every batch step at `debug`,
// rejected socket frames at `warn`.

pub fn install_logger(max_level: Level) -> Result<(), SetGlobalDefaultError> {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_max_level(max_level)
    .finish();
  subscriber::set_global_default(subscriber)
}

fn max_level(verbose: bool) -> Level {
  if verbose {
    Level::DEBUG
  } else {
    Level::INFO
  }
}

/// Full backtraces only when `--verbose` asks for them.
#[cfg(debug_assertions)]
fn backtrace_verbosity(verbose: bool) -> better_panic::Verbosity {
  if verbose {
    better_panic::Verbosity::Full
  } else {
    better_panic::Verbosity::Medium
  }
}

/// Debug builds get annotated backtraces, release builds a crash report file.
fn install_panic_hook(verbose: bool) {
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(true)
      .lineno_suffix(true)
      .verbosity(backtrace_verbosity(verbose))
      .install();
  }

  #[cfg(not(debug_assertions))]
  {
    let _ = verbose;
    setup_panic!();
  }
}

pub fn init_logging(verbose: bool) -> Result<(), SetGlobalDefaultError> {
  install_panic_hook(verbose);
  install_logger(max_level(verbose))
}

/// Scoped subscriber that writes through the test harness' captured output.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_test_writer()
    .with_max_level(Level::DEBUG)
    .finish();
  subscriber::set_default(subscriber)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbose_raises_log_level() {
    assert_eq!(max_level(false), Level::INFO);
    assert_eq!(max_level(true), Level::DEBUG);
  }

  #[cfg(debug_assertions)]
  #[test]
  fn test_verbose_selects_full_backtraces() {
    assert!(matches!(backtrace_verbosity(true), better_panic::Verbosity::Full));
    assert!(matches!(backtrace_verbosity(false), better_panic::Verbosity::Medium));
  }
}
