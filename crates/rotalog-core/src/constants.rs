//! Constants and default values for rotalog

use crate::types::{LogFormat, Severity};

/// Default max size of a single log file in megabytes
pub const DEFAULT_LOG_MAX_SIZE_MB: u64 = 10;

/// Default retention horizon for rotated files, in days
pub const DEFAULT_LOG_MAX_DAYS: u64 = 90;

/// Default number of rotated files to keep
pub const DEFAULT_LOG_MAX_BACKUPS: usize = 5;

/// Default severity when the configured one is missing or unknown
pub const DEFAULT_LOG_LEVEL: Severity = Severity::Info;

/// Default output format when the configured one is missing or unknown
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Text;

/// Timestamp layout used by every formatter (chrono syntax)
pub const LOG_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// Timestamp layout embedded in rotated file names (chrono syntax)
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Extension appended to compressed backups
pub const COMPRESS_SUFFIX: &str = ".gz";

/// Bytes per configured megabyte
pub const MEGABYTE: u64 = 1024 * 1024;
