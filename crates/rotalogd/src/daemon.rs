//! Heartbeat loop

use rotalog::Logger;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Emits one line per severity every `interval`
pub struct Heartbeat {
    logger: Logger,
    interval: Duration,
    count: Option<u64>,
}

impl Heartbeat {
    pub fn new(logger: Logger, interval: Duration, count: Option<u64>) -> Self {
        Self {
            logger,
            interval,
            count,
        }
    }

    /// Run until `count` beats were emitted, forever if unset
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut tick: u64 = 0;

        loop {
            if self.count.is_some_and(|n| tick >= n) {
                break;
            }
            ticker.tick().await;
            tick += 1;

            let level = self.logger.level();
            debug!(tick, %level, "heartbeat");
            info!(tick, %level, "heartbeat");
            warn!(tick, %level, "heartbeat");
            error!(tick, %level, "heartbeat");

            self.logger.report_rotation();
        }
    }
}
