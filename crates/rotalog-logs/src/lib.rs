//! rotalog Logs - Size-based rotation, retention and compression of log files

mod mill;
mod rotation;
mod writer;

pub use mill::{compress_file, list_backups, mill, Backup, MillReport};
pub use rotation::RotationPolicy;
pub use writer::{Clock, LogFile, RollingSink, RollingSinkWriter};

use rotalog_core::ResolvedConfig;

/// Rotation policy for a resolved config, `None` when rotation is disabled
pub fn policy_for(config: &ResolvedConfig) -> Option<RotationPolicy> {
    config.log_rotate.then(|| {
        RotationPolicy::new(config.max_size_bytes(), config.max_days, config.max_backups)
    })
}
