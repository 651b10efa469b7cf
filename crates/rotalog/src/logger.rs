//! Logger handle built from a [`LogConfig`]

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rotalog_core::{Error, LogConfig, LogTarget, ResolvedConfig, Result, Severity};
use rotalog_logs::{LogFile, MillReport, RollingSink};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Dispatch};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{reload, Layer, Registry};

use crate::format::{build_layer, level_filter};

type LevelLayer = reload::Layer<LevelFilter, Registry>;
type Filtered = Layered<LevelLayer, Registry>;
type OutputLayer = Box<dyn Layer<Filtered> + Send + Sync + 'static>;

static GLOBAL: OnceCell<Logger> = OnceCell::new();

/// Handle to one configured logging pipeline
///
/// Cheap to clone; all clones share the same level, formatter and sink.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    dispatch: Dispatch,
    level: reload::Handle<LevelFilter, Registry>,
    output: reload::Handle<OutputLayer, Filtered>,
    state: RwLock<State>,
}

struct State {
    config: ResolvedConfig,
    level: Severity,
    sink: Option<RollingSink>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Logger")
            .field("target", &state.config.target)
            .field("format", &state.config.format)
            .field("level", &state.level)
            .finish()
    }
}

impl Logger {
    /// Build a logger from `config` without installing it anywhere
    pub fn new(config: &LogConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        let (output, sink) = open_output(&resolved)?;

        let (level_layer, level) = reload::Layer::new(level_filter(resolved.level));
        let (output_layer, output) = reload::Layer::new(output);
        let subscriber = tracing_subscriber::registry()
            .with(level_layer)
            .with(output_layer);

        let logger = Self {
            inner: Arc::new(Inner {
                dispatch: Dispatch::new(subscriber),
                level,
                output,
                state: RwLock::new(State {
                    level: resolved.level,
                    config: resolved.clone(),
                    sink,
                }),
            }),
        };

        logger.report_substitutions(&resolved);
        Ok(logger)
    }

    /// Replace formatter, sink and level from a new config
    ///
    /// The config is validated and the sink opened before anything is
    /// swapped, so on error the previous setup stays in place.
    pub fn reconfigure(&self, config: &LogConfig) -> Result<()> {
        let resolved = config.resolve()?;
        let (output, sink) = open_output(&resolved)?;

        self.inner
            .output
            .reload(output)
            .map_err(|e| Error::install(format!("reload output: {}", e)))?;
        {
            let mut state = self.inner.state.write();
            self.inner
                .level
                .reload(level_filter(resolved.level))
                .map_err(|e| Error::install(format!("reload level: {}", e)))?;
            state.level = resolved.level;
            state.config = resolved.clone();
            state.sink = sink;
        }

        self.in_scope(|| {
            info!(
                format = %resolved.format,
                level = %resolved.level,
                "Logger reconfigured"
            )
        });
        self.report_substitutions(&resolved);
        Ok(())
    }

    /// Change the active level; formatter and sink are untouched
    pub fn set_level(&self, level: Severity) {
        // The filter changes first so `level()` never reports a level that
        // is not in effect
        let previous = {
            let mut state = self.inner.state.write();
            if let Err(e) = self.inner.level.reload(level_filter(level)) {
                drop(state);
                self.in_scope(|| warn!("Failed to change log level: {}", e));
                return;
            }
            std::mem::replace(&mut state.level, level)
        };

        if previous != level {
            self.in_scope(|| info!(from = %previous, to = %level, "Log level changed"));
        }
    }

    /// Currently active level
    pub fn level(&self) -> Severity {
        self.inner.state.read().level
    }

    /// Settings as resolved at the last (re)configuration
    pub fn config(&self) -> ResolvedConfig {
        self.inner.state.read().config.clone()
    }

    /// Path of the active log file, `None` when logging to stderr
    pub fn log_file(&self) -> Option<PathBuf> {
        self.inner.state.read().sink.as_ref().map(|s| s.path())
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.inner.dispatch
    }

    /// Run `f` with this logger as the thread's default subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.inner.dispatch, f)
    }

    /// Make this logger the process-wide default; fails if one is already set
    pub fn install_global(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.inner.dispatch.clone())
            .map_err(|e| Error::install(e.to_string()))
    }

    /// Rotate the log file now, regardless of its size
    pub fn rotate(&self) -> Result<()> {
        let sink = self.inner.state.read().sink.clone();
        if let Some(sink) = sink {
            let report = sink.rotate()?;
            self.log_mill_report(report);
        }
        Ok(())
    }

    /// Log what size-triggered rotations pruned or compressed since the last call
    ///
    /// Rotation happens inside the write path where the logger cannot log
    /// about itself, so outcomes are held, merged, until this is called.
    pub fn report_rotation(&self) -> Option<MillReport> {
        let sink = self.inner.state.read().sink.clone();
        let report = sink.and_then(|s| s.take_mill_report());
        self.log_mill_report(report.clone());
        report
    }

    fn log_mill_report(&self, report: Option<MillReport>) {
        let Some(report) = report else { return };
        self.in_scope(|| {
            for path in &report.removed {
                info!("Removed old log file {}", path.display());
            }
            for path in &report.compressed {
                info!("Compressed rotated log {}", path.display());
            }
            for error in &report.errors {
                warn!("Log rotation cleanup failed: {}", error);
            }
        });
    }

    fn report_substitutions(&self, resolved: &ResolvedConfig) {
        if resolved.substitutions.is_empty() {
            return;
        }
        self.in_scope(|| {
            for sub in &resolved.substitutions {
                warn!("{}", sub);
            }
        });
    }
}

/// Open the sink for `resolved` and wrap it in the configured formatter
fn open_output(resolved: &ResolvedConfig) -> Result<(OutputLayer, Option<RollingSink>)> {
    match &resolved.target {
        LogTarget::Stderr => {
            let ansi = std::io::stderr().is_terminal();
            let layer = build_layer(resolved.format, BoxMakeWriter::new(std::io::stderr), ansi);
            Ok((layer, None))
        }
        LogTarget::File(path) => {
            let file = LogFile::open(path.clone(), rotalog_logs::policy_for(resolved))?;
            let sink = RollingSink::new(file);
            let layer = build_layer(resolved.format, BoxMakeWriter::new(sink.clone()), false);
            Ok((layer, Some(sink)))
        }
    }
}

/// Configure the process-wide logger
///
/// The first successful call builds a [`Logger`] and installs it as the
/// global `tracing` subscriber. Later calls reconfigure that same logger.
pub fn init_logger(config: &LogConfig) -> Result<Logger> {
    let mut created = false;
    let logger = GLOBAL.get_or_try_init(|| {
        created = true;
        let logger = Logger::new(config)?;
        logger.install_global()?;
        Ok::<_, Error>(logger)
    })?;

    if !created {
        logger.reconfigure(config)?;
    }
    Ok(logger.clone())
}

/// The process-wide logger, if [`init_logger`] has succeeded
pub fn global() -> Option<Logger> {
    GLOBAL.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotalog_core::LogFormat;
    use std::fs;
    use tempfile::TempDir;
    use tracing::{debug, error};

    #[test]
    fn test_logger_writes_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "info")).unwrap();

        logger.in_scope(|| {
            info!("visible line");
            debug!("hidden line");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("visible line"));
        assert!(content.contains("INFO"));
        assert!(!content.contains("hidden line"));
        assert_eq!(logger.log_file(), Some(path));
    }

    #[test]
    fn test_set_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "info")).unwrap();

        logger.set_level(Severity::Debug);
        assert_eq!(logger.level(), Severity::Debug);
        logger.in_scope(|| debug!("now visible"));

        logger.set_level(Severity::Error);
        logger.in_scope(|| {
            warn!("now hidden");
            error!("still visible");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("now visible"));
        assert!(!content.contains("now hidden"));
        assert!(content.contains("still visible"));
    }

    #[test]
    fn test_level_matches_filter_after_concurrent_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "info")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let level = if i % 2 == 0 { Severity::Debug } else { Severity::Error };
                        logger.set_level(level);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let level = logger.level();
        logger.in_scope(|| debug!("final debug line"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.contains("final debug line"), level == Severity::Debug);
    }

    #[test]
    fn test_fatal_level_lets_errors_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "FATAL")).unwrap();
        assert_eq!(logger.level(), Severity::Fatal);

        logger.in_scope(|| {
            warn!("dropped");
            error!("kept");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("dropped"));
        assert!(content.contains("kept"));
    }

    #[test]
    fn test_substitution_warning_logged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let config = LogConfig {
            format: "yaml".to_string(),
            ..LogConfig::new(&path, "info")
        };
        let logger = Logger::new(&config).unwrap();
        assert_eq!(logger.config().format, LogFormat::Text);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("unknown log format \"yaml\", using text"));
        assert!(content.contains("WARN"));
    }

    #[test]
    fn test_reconfigure_directory_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "warn")).unwrap();

        let err = logger
            .reconfigure(&LogConfig::new(dir.path(), "debug"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
        assert_eq!(logger.level(), Severity::Warn);
        assert_eq!(logger.log_file(), Some(path.clone()));

        logger.in_scope(|| warn!("still going to the old file"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("still going to the old file"));
    }

    #[test]
    fn test_reconfigure_switches_file_and_format() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("second.log");
        let logger = Logger::new(&LogConfig::new(&first, "info")).unwrap();

        let config = LogConfig {
            format: "json".to_string(),
            ..LogConfig::new(&second, "debug")
        };
        logger.reconfigure(&config).unwrap();
        logger.in_scope(|| debug!(answer = 42, "after switch"));

        assert!(!fs::read_to_string(&first).unwrap().contains("after switch"));
        let line = fs::read_to_string(&second)
            .unwrap()
            .lines()
            .find(|l| l.contains("after switch"))
            .unwrap()
            .to_string();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["answer"], 42);
        assert_eq!(value["level"], "DEBUG");
    }

    #[test]
    fn test_forced_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let logger = Logger::new(&LogConfig::new(&path, "info")).unwrap();

        logger.in_scope(|| info!("before rotation"));
        logger.rotate().unwrap();
        logger.in_scope(|| info!("after rotation"));

        let active = fs::read_to_string(&path).unwrap();
        assert!(!active.contains("before rotation"));
        assert!(active.contains("after rotation"));
        assert!(active.contains("Compressed rotated log"));

        let gz_count = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".log.gz")
            })
            .count();
        assert_eq!(gz_count, 1);
    }
}
