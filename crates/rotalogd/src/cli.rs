//! CLI argument definitions

use clap::Parser;
use rotalog::LogConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rotalogd")]
#[command(
    version,
    about = "Run a configured logger; SIGUSR1 switches to debug, SIGUSR2 to error"
)]
pub struct Cli {
    /// Config file (.toml, .json, .yaml or .yml)
    #[arg(short, long, env = "ROTALOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file; overrides the config file
    #[arg(short, long)]
    pub filename: Option<PathBuf>,

    /// fatal, error, warn, info or debug; overrides the config file
    #[arg(short, long)]
    pub level: Option<String>,

    /// json, console or text; overrides the config file
    #[arg(long)]
    pub format: Option<String>,

    /// Milliseconds between heartbeats
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Exit after this many heartbeats instead of waiting for SIGTERM
    #[arg(long)]
    pub count: Option<u64>,
}

impl Cli {
    /// Config file contents with command-line overrides applied
    pub fn log_config(&self) -> rotalog::Result<LogConfig> {
        let mut config = match &self.config {
            Some(path) => LogConfig::load(path)?,
            None => LogConfig::default(),
        };

        if let Some(filename) = &self.filename {
            config.filename = Some(filename.clone());
        }
        if let Some(level) = &self.level {
            config.level = level.clone();
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        Ok(config)
    }
}
