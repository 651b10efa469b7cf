//! Log file writer with rotation support

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rotalog_core::Result;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;

use crate::mill::{self, MillReport};
use crate::rotation::RotationPolicy;

/// Source of "now" for backup names and retention
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Append-only log file, rotated by size when a policy is set
///
/// Nothing in the write path emits `tracing` events: the file usually sits
/// behind the subscriber that would receive them.
pub struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
    policy: Option<RotationPolicy>,
    current_size: u64,
    clock: Clock,
    last_mill: Option<MillReport>,
}

impl fmt::Debug for LogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFile")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("current_size", &self.current_size)
            .finish()
    }
}

impl LogFile {
    /// Open (or create) the log file in append mode
    pub fn open(path: PathBuf, policy: Option<RotationPolicy>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let current_size = file.metadata()?.len();
        debug!(
            "Opened log file {} ({} bytes, rotation {})",
            path.display(),
            current_size,
            if policy.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            policy,
            current_size,
            clock: Arc::new(Utc::now),
            last_mill: None,
        })
    }

    /// Replace the clock, mostly useful in tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Write one record, rotating first if it would overflow the file
    pub fn write_record(&mut self, data: &[u8]) -> io::Result<()> {
        if let Some(policy) = &self.policy {
            let len = data.len() as u64;
            if len > policy.max_size_bytes {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "write length {} exceeds maximum file size {}",
                        len, policy.max_size_bytes
                    ),
                ));
            }
            if self.current_size + len > policy.max_size_bytes {
                self.rotate()?;
            }
        }

        self.writer.write_all(data)?;
        self.writer.flush()?;
        self.current_size += data.len() as u64;
        Ok(())
    }

    /// Move the active file aside and start a fresh one
    ///
    /// Without a rotation policy this is a no-op.
    pub fn rotate(&mut self) -> io::Result<()> {
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => return Ok(()),
        };

        self.writer.flush()?;

        let now = (self.clock)();
        if self.path.exists() {
            fs::rename(&self.path, policy.backup_path(&self.path, now))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;

        self.writer = BufWriter::new(file);
        self.current_size = 0;

        let report = match mill::mill(&self.path, &policy, now) {
            Ok(report) => report,
            Err(e) => MillReport {
                errors: vec![format!("scan {}: {}", self.path.display(), e)],
                ..MillReport::default()
            },
        };
        self.last_mill
            .get_or_insert_with(MillReport::default)
            .merge(report);

        Ok(())
    }

    /// Mill passes since the last read, merged in order; cleared on read
    pub fn take_mill_report(&mut self) -> Option<MillReport> {
        self.last_mill.take()
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get current file size
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn policy(&self) -> Option<&RotationPolicy> {
        self.policy.as_ref()
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Shared handle to a [`LogFile`], usable as a `tracing-subscriber` writer
#[derive(Clone, Debug)]
pub struct RollingSink {
    inner: Arc<Mutex<LogFile>>,
}

impl RollingSink {
    pub fn new(file: LogFile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.inner.lock().path().to_path_buf()
    }

    /// Force a rotation and return every mill outcome not yet taken
    pub fn rotate(&self) -> io::Result<Option<MillReport>> {
        let mut file = self.inner.lock();
        file.rotate()?;
        Ok(file.take_mill_report())
    }

    /// Outcomes of rotations triggered by writes, if not yet taken
    pub fn take_mill_report(&self) -> Option<MillReport> {
        self.inner.lock().take_mill_report()
    }
}

/// Writer handed out per event; holds the file lock for one record
pub struct RollingSinkWriter<'a> {
    file: MutexGuard<'a, LogFile>,
}

impl Write for RollingSinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingSink {
    type Writer = RollingSinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingSinkWriter {
            file: self.inner.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tempfile::TempDir;

    /// Clock that advances one second per call
    fn ticking_clock(start: &str) -> Clock {
        let start = DateTime::parse_from_rfc3339(start)
            .unwrap()
            .with_timezone(&Utc);
        let ticks = Arc::new(AtomicI64::new(0));
        Arc::new(move || start + chrono::Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
    }

    fn backups(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != "test.log")
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_log_file_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("test.log");

        let file = LogFile::open(path.clone(), Some(RotationPolicy::default()));
        assert!(file.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        fs::write(&path, "existing\n").unwrap();

        let mut file = LogFile::open(path.clone(), Some(RotationPolicy::default())).unwrap();
        assert_eq!(file.current_size(), 9);
        file.write_record(b"Hello, world!\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nHello, world!\n");
        assert_eq!(file.current_size(), 23);
    }

    #[test]
    fn test_log_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let policy = RotationPolicy::new(100, 90, 3).with_local_time(false);
        let mut file = LogFile::open(path.clone(), Some(policy))
            .unwrap()
            .with_clock(ticking_clock("2024-03-01T10:00:00Z"));

        // 28 bytes per line, three fit in a file
        for i in 0..7 {
            file.write_record(format!("line {:02} with some content..\n", i).as_bytes())
                .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "line 06 with some content..\n");
        assert_eq!(
            backups(dir.path()),
            vec![
                "test-2024-03-01T10-00-00.000.log.gz".to_string(),
                "test-2024-03-01T10-00-01.000.log.gz".to_string(),
            ]
        );
    }

    #[test]
    fn test_rotation_keeps_max_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let policy = RotationPolicy::new(10, 90, 2).with_local_time(false);
        let mut file = LogFile::open(path.clone(), Some(policy))
            .unwrap()
            .with_clock(ticking_clock("2024-03-01T10:00:00Z"));

        for _ in 0..6 {
            file.write_record(b"0123456789").unwrap();
        }

        assert_eq!(
            backups(dir.path()),
            vec![
                "test-2024-03-01T10-00-03.000.log.gz".to_string(),
                "test-2024-03-01T10-00-04.000.log.gz".to_string(),
            ]
        );
        let report = file.take_mill_report().unwrap();
        assert_eq!(report.removed.len(), 3);
        assert_eq!(report.compressed.len(), 5);
        assert!(file.take_mill_report().is_none());
    }

    #[test]
    fn test_mill_reports_accumulate_until_taken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let policy = RotationPolicy::new(10, 90, 1).with_local_time(false);
        let mut file = LogFile::open(path.clone(), Some(policy))
            .unwrap()
            .with_clock(ticking_clock("2024-03-01T10:00:00Z"));

        // Four rotations, each one pruning the backup before it
        for _ in 0..5 {
            file.write_record(b"0123456789").unwrap();
        }

        assert_eq!(
            backups(dir.path()),
            vec!["test-2024-03-01T10-00-03.000.log.gz".to_string()]
        );
        let report = file.take_mill_report().unwrap();
        assert_eq!(report.removed.len(), 3);
        assert_eq!(report.compressed.len(), 4);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_rotation_without_compression() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let policy = RotationPolicy::new(10, 90, 5)
            .with_local_time(false)
            .with_compress(false);
        let mut file = LogFile::open(path.clone(), Some(policy))
            .unwrap()
            .with_clock(ticking_clock("2024-03-01T10:00:00Z"));

        file.write_record(b"first-----").unwrap();
        file.write_record(b"second----").unwrap();

        let backup = dir.path().join("test-2024-03-01T10-00-00.000.log");
        assert_eq!(fs::read_to_string(backup).unwrap(), "first-----");
        assert_eq!(fs::read_to_string(&path).unwrap(), "second----");
    }

    #[test]
    fn test_oversized_record_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let mut file = LogFile::open(path, Some(RotationPolicy::new(4, 90, 5))).unwrap();
        let err = file.write_record(b"too long").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(file.current_size(), 0);
    }

    #[test]
    fn test_no_policy_never_rotates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let mut file = LogFile::open(path.clone(), None).unwrap();
        for _ in 0..100 {
            file.write_record(b"0123456789").unwrap();
        }
        file.rotate().unwrap();

        assert_eq!(file.current_size(), 1000);
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn test_rolling_sink_make_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");

        let sink = RollingSink::new(LogFile::open(path.clone(), None).unwrap());
        {
            let mut writer = sink.make_writer();
            writer.write_all(b"via sink\n").unwrap();
        }

        assert_eq!(sink.path(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "via sink\n");
    }
}
