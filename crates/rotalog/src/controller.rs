//! Runtime level changes driven by signals

use rotalog_core::{Result, Severity};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logger::Logger;

/// Operator request to change verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSignal {
    /// SIGUSR1
    RaiseVerbosity,
    /// SIGUSR2
    LowerVerbosity,
}

impl LevelSignal {
    /// Level the logger is switched to
    pub fn level(self) -> Severity {
        match self {
            LevelSignal::RaiseVerbosity => Severity::Debug,
            LevelSignal::LowerVerbosity => Severity::Error,
        }
    }
}

/// Applies [`LevelSignal`]s to a [`Logger`]
///
/// Holds no state besides the logger; the last signal processed wins.
#[derive(Debug, Clone)]
pub struct LevelController {
    logger: Logger,
}

impl LevelController {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn apply(&self, signal: LevelSignal) {
        debug!(?signal, "Applying level signal");
        self.logger.set_level(signal.level());
    }

    /// Listen for SIGUSR1 / SIGUSR2 until `cancel` fires
    ///
    /// Must be called from within a tokio runtime. Handlers are registered
    /// before this returns, so signals sent afterwards are not missed.
    #[cfg(unix)]
    pub fn spawn(self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut raise = signal(SignalKind::user_defined1())?;
        let mut lower = signal(SignalKind::user_defined2())?;

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    Some(()) = raise.recv() => self.apply(LevelSignal::RaiseVerbosity),
                    Some(()) = lower.recv() => self.apply(LevelSignal::LowerVerbosity),
                    else => break,
                }
            }
            debug!("Level controller stopped");
        }))
    }

    #[cfg(not(unix))]
    pub fn spawn(self, _cancel: CancellationToken) -> Result<JoinHandle<()>> {
        Err(rotalog_core::Error::Unsupported(
            "signal-driven level changes need SIGUSR1/SIGUSR2".to_string(),
        ))
    }

    /// Apply signals from a channel until it closes or `cancel` fires
    pub fn spawn_with_channel(
        self,
        mut rx: mpsc::Receiver<LevelSignal>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    signal = rx.recv() => match signal {
                        Some(signal) => self.apply(signal),
                        None => break,
                    },
                }
            }
            debug!("Level controller stopped");
        })
    }
}
