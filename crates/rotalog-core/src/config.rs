//! Logger configuration
//!
//! A [`LogConfig`] can be built in code or loaded from a file in any of:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::{LogFormat, LogTarget, Severity, Substitution};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Log file configuration
///
/// Zero numeric fields mean "unset" and are replaced by defaults on
/// [`LogConfig::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Log file name; empty or absent logs to stderr
    pub filename: Option<PathBuf>,
    /// Max size of a single file in MB
    pub max_size: u64,
    /// Days to keep rotated files
    pub max_days: u64,
    /// Max number of rotated files to keep
    pub max_backups: usize,
    /// fatal, error, warn, info or debug
    pub level: String,
    /// json, console or text
    pub format: String,
    /// Rotate the log file (default: true)
    pub log_rotate: Option<bool>,
}

/// Normalized settings ready to be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub target: LogTarget,
    pub level: Severity,
    pub format: LogFormat,
    pub max_size_mb: u64,
    pub max_days: u64,
    pub max_backups: usize,
    pub log_rotate: bool,
    /// Unrecognized values that were replaced by defaults
    pub substitutions: Vec<Substitution>,
}

impl ResolvedConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(MEGABYTE)
    }
}

impl LogConfig {
    /// Config writing to `filename` at `level`, everything else default
    pub fn new<P: Into<PathBuf>>(filename: P, level: &str) -> Self {
        Self {
            filename: Some(filename.into()),
            level: level.to_string(),
            ..Self::default()
        }
    }

    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::config(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(config)
    }

    /// The configured file, if any; an empty path counts as none
    pub fn target(&self) -> LogTarget {
        match &self.filename {
            Some(path) if !path.as_os_str().is_empty() => LogTarget::File(path.clone()),
            _ => LogTarget::Stderr,
        }
    }

    /// Reject a target that is an existing directory
    pub fn validate(&self) -> Result<()> {
        if let LogTarget::File(path) = self.target() {
            if let Ok(meta) = std::fs::metadata(&path) {
                if meta.is_dir() {
                    return Err(Error::InvalidTarget(path));
                }
            }
        }
        Ok(())
    }

    /// Validate and apply defaults
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let mut substitutions = Vec::new();

        let level = match Severity::parse(&self.level) {
            Some(level) => level,
            None => {
                if !self.level.is_empty() {
                    substitutions.push(Substitution::Level {
                        given: self.level.clone(),
                        used: DEFAULT_LOG_LEVEL,
                    });
                }
                DEFAULT_LOG_LEVEL
            }
        };

        let format = match LogFormat::parse(&self.format) {
            Some(format) => format,
            None => {
                if !self.format.is_empty() {
                    substitutions.push(Substitution::Format {
                        given: self.format.clone(),
                        used: DEFAULT_LOG_FORMAT,
                    });
                }
                DEFAULT_LOG_FORMAT
            }
        };

        Ok(ResolvedConfig {
            target: self.target(),
            level,
            format,
            max_size_mb: or_default(self.max_size, DEFAULT_LOG_MAX_SIZE_MB),
            max_days: or_default(self.max_days, DEFAULT_LOG_MAX_DAYS),
            max_backups: or_default(self.max_backups, DEFAULT_LOG_MAX_BACKUPS),
            log_rotate: self.log_rotate.unwrap_or(true),
            substitutions,
        })
    }
}

fn or_default<T: Default + PartialEq>(value: T, default: T) -> T {
    if value == T::default() {
        default
    } else {
        value
    }
}
