//! rotalog - Config-driven structured logging
//!
//! Translates a [`LogConfig`] into a `tracing` pipeline:
//! - severity filter, changeable at runtime
//! - JSON or human-readable formatting with millisecond local timestamps
//! - a size-rotated log file with age/count retention and gzip, or stderr
//!
//! [`LevelController`] switches the level on SIGUSR1 (debug) and SIGUSR2 (error).

mod controller;
mod format;
mod logger;

pub use controller::{LevelController, LevelSignal};
pub use format::{level_filter, LocalTimer};
pub use logger::{global, init_logger, Logger};

pub use rotalog_core::{
    ConfigFormat, Error, LogConfig, LogFormat, LogTarget, ResolvedConfig, Result, Severity,
    Substitution,
};
pub use rotalog_logs::{MillReport, RotationPolicy};
pub use tokio_util::sync::CancellationToken;
