//! Logging set-up.
//!
//! The crate logs through the `log` facade.  Root visitation logs at `debug` (one line per
//! phase) and `trace` (one line per root when `verbose_root_logging` is set); state word
//! transitions log at `trace`.  An embedding runtime that installs its own logger before creating
//! a [`crate::RootManager`] keeps it.

use log::SetLoggerError;

/// The filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Attempt to init an env_logger with [`DEFAULT_FILTER`].
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub fn try_init() -> Result<(), SetLoggerError> {
    try_init_with_filter(DEFAULT_FILTER)
}

/// Attempt to init an env_logger, using `default_filter` unless `RUST_LOG` says otherwise.
/// Fails if a logger is already installed.
pub fn try_init_with_filter(default_filter: &str) -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_filter),
            )
        } else {
            let _ = default_filter;
            Ok(())
        }
    }
}
