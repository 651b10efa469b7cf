//! Post-rotation pruning and compression of backups

use chrono::{DateTime, TimeDelta, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use rotalog_core::constants;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::rotation::RotationPolicy;

/// A rotated file found next to the active log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub rotated_at: DateTime<Utc>,
    pub compressed: bool,
}

impl Backup {
    /// Name without the compression suffix, so `x.log` and `x.log.gz` compare equal
    fn key(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.strip_suffix(constants::COMPRESS_SUFFIX) {
            Some(plain) => plain.to_string(),
            None => name,
        }
    }
}

/// Outcome of a mill pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MillReport {
    pub removed: Vec<PathBuf>,
    pub compressed: Vec<PathBuf>,
    /// Per-file failures; a failure never aborts the pass
    pub errors: Vec<String>,
}

/// Entries kept per list while reports pile up unread; the oldest go first
pub const MAX_PENDING_ENTRIES: usize = 1024;

impl MillReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.compressed.is_empty() && self.errors.is_empty()
    }

    /// Fold a later pass into this one
    pub fn merge(&mut self, later: MillReport) {
        append_bounded(&mut self.removed, later.removed);
        append_bounded(&mut self.compressed, later.compressed);
        append_bounded(&mut self.errors, later.errors);
    }
}

fn append_bounded<T>(into: &mut Vec<T>, more: Vec<T>) {
    into.extend(more);
    if into.len() > MAX_PENDING_ENTRIES {
        let excess = into.len() - MAX_PENDING_ENTRIES;
        into.drain(..excess);
    }
}

/// List backups of `base`, newest first
pub fn list_backups(base: &Path, policy: &RotationPolicy) -> io::Result<Vec<Backup>> {
    let dir = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some((rotated_at, compressed)) = policy.parse_backup_name(base, &name) {
            backups.push(Backup {
                path: entry.path(),
                rotated_at,
                compressed,
            });
        }
    }

    backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
    Ok(backups)
}

/// Enforce `max_backups` and `max_age_days`, then compress what is left
pub fn mill(base: &Path, policy: &RotationPolicy, now: DateTime<Utc>) -> io::Result<MillReport> {
    let mut report = MillReport::default();
    let backups = list_backups(base, policy)?;

    let mut remaining = Vec::with_capacity(backups.len());
    let mut doomed = Vec::new();

    if policy.max_backups > 0 {
        let mut preserved = HashSet::new();
        for backup in backups {
            preserved.insert(backup.key());
            if preserved.len() > policy.max_backups {
                doomed.push(backup);
            } else {
                remaining.push(backup);
            }
        }
    } else {
        remaining = backups;
    }

    if let Some(cutoff) = retention_cutoff(policy.max_age_days, now) {
        let (expired, fresh): (Vec<_>, Vec<_>) =
            remaining.into_iter().partition(|b| b.rotated_at < cutoff);
        doomed.extend(expired);
        remaining = fresh;
    }

    for backup in doomed {
        match fs::remove_file(&backup.path) {
            Ok(()) => report.removed.push(backup.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => report
                .errors
                .push(format!("remove {}: {}", backup.path.display(), e)),
        }
    }

    if policy.compress {
        for backup in remaining.into_iter().filter(|b| !b.compressed) {
            match compress_file(&backup.path) {
                Ok(dst) => report.compressed.push(dst),
                Err(e) => report
                    .errors
                    .push(format!("compress {}: {}", backup.path.display(), e)),
            }
        }
    }

    Ok(report)
}

/// Oldest rotation time still kept; `None` when nothing can expire
fn retention_cutoff(max_age_days: u64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if max_age_days == 0 {
        return None;
    }
    i64::try_from(max_age_days)
        .ok()
        .and_then(TimeDelta::try_days)
        .and_then(|age| now.checked_sub_signed(age))
}

/// Gzip `src` to `<src>.gz` and remove `src`
pub fn compress_file(src: &Path) -> io::Result<PathBuf> {
    let mut name = src.as_os_str().to_owned();
    name.push(constants::COMPRESS_SUFFIX);
    let dst = PathBuf::from(name);

    let result = (|| -> io::Result<()> {
        let mut reader = BufReader::new(File::open(src)?);
        let out = BufWriter::new(File::create(&dst)?);
        let mut encoder = GzEncoder::new(out, Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&dst);
        return Err(e);
    }

    fs::remove_file(src)?;
    Ok(dst)
}
