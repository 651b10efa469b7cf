//! Core types for rotalog

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL};

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// Case-insensitive lookup, `None` for anything unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fatal" => Some(Severity::Fatal),
            "error" => Some(Severity::Error),
            "warn" => Some(Severity::Warn),
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }

    /// Like [`Severity::parse`], falling back to the default level
    pub fn resolve(s: &str) -> Self {
        Self::parse(s).unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable, colored when writing to a terminal stream
    Console,
    /// Human-readable, plain
    Text,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Console => "console",
            LogFormat::Text => "text",
        }
    }

    /// Case-insensitive lookup, `None` for anything unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "console" => Some(LogFormat::Console),
            "text" => Some(LogFormat::Text),
            _ => None,
        }
    }

    /// Like [`LogFormat::parse`], falling back to the default format
    pub fn resolve(s: &str) -> Self {
        Self::parse(s).unwrap_or(DEFAULT_LOG_FORMAT)
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// A configured value that was not recognized and got replaced by a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    Level { given: String, used: Severity },
    Format { given: String, used: LogFormat },
}

impl std::fmt::Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Substitution::Level { given, used } => {
                write!(f, "unknown log level {:?}, using {}", given, used)
            }
            Substitution::Format { given, used } => {
                write!(f, "unknown log format {:?}, using {}", given, used)
            }
        }
    }
}
