//! Log rotation policy and backup naming

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rotalog_core::constants;
use std::path::{Path, PathBuf};

/// Log rotation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum log file size in bytes
    pub max_size_bytes: u64,
    /// Rotated files older than this many days are deleted
    pub max_age_days: u64,
    /// Maximum number of rotated files to keep
    pub max_backups: usize,
    /// Use local time in backup names instead of UTC
    pub local_time: bool,
    /// Gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: constants::DEFAULT_LOG_MAX_SIZE_MB * constants::MEGABYTE,
            max_age_days: constants::DEFAULT_LOG_MAX_DAYS,
            max_backups: constants::DEFAULT_LOG_MAX_BACKUPS,
            local_time: true,
            compress: true,
        }
    }
}

impl RotationPolicy {
    pub fn new(max_size_bytes: u64, max_age_days: u64, max_backups: usize) -> Self {
        Self {
            max_size_bytes,
            max_age_days,
            max_backups,
            ..Self::default()
        }
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    /// Path a file rotated at `at` is renamed to
    pub fn backup_path(&self, base: &Path, at: DateTime<Utc>) -> PathBuf {
        let (prefix, ext) = backup_affixes(base);
        let stamp = if self.local_time {
            at.with_timezone(&Local)
                .format(constants::BACKUP_TIME_FORMAT)
                .to_string()
        } else {
            at.format(constants::BACKUP_TIME_FORMAT).to_string()
        };
        base.with_file_name(format!("{}{}{}", prefix, stamp, ext))
    }

    /// Timestamp embedded in a backup file name, if `name` is a backup of `base`
    pub fn parse_backup_name(&self, base: &Path, name: &str) -> Option<(DateTime<Utc>, bool)> {
        let (prefix, ext) = backup_affixes(base);
        let rest = name.strip_prefix(&prefix)?;
        let (rest, compressed) = match rest.strip_suffix(constants::COMPRESS_SUFFIX) {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let stamp = rest.strip_suffix(&ext)?;
        let naive = NaiveDateTime::parse_from_str(stamp, constants::BACKUP_TIME_FORMAT).ok()?;

        let at = if self.local_time {
            Local
                .from_local_datetime(&naive)
                .earliest()?
                .with_timezone(&Utc)
        } else {
            Utc.from_utc_datetime(&naive)
        };
        Some((at, compressed))
    }
}

/// `("app-", ".log")` for `app.log`
fn backup_affixes(base: &Path) -> (String, String) {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (format!("{}-", stem), ext)
}
