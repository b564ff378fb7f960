//! Readiness polling: wait for headscale to answer its own CLI.

use std::time::Duration;

use tracing::{debug, info};

use crate::control::ControlCli;

pub const POLL_BUDGET: u32 = 60;
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Terminal outcome of one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

/// One bounded polling run. State is transient: every addon restart probes
/// from scratch, regardless of what earlier runs observed.
pub struct ReadinessPoller {
    budget: u32,
    interval: Duration,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self {
            budget: POLL_BUDGET,
            interval: POLL_INTERVAL,
        }
    }
}

impl ReadinessPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the schedule. Tests run with a zero interval.
    pub fn with_schedule(budget: u32, interval: Duration) -> Self {
        Self { budget, interval }
    }

    /// Probe until headscale answers or the attempt budget runs out.
    ///
    /// Fixed 1 s spacing, no backoff: cold start is normally well under a
    /// minute, and the budget bounds the worst case.
    pub async fn wait_ready(&self, cli: &impl ControlCli) -> PollOutcome {
        for attempt in 1..=self.budget {
            match cli.list_api_keys().await {
                Ok(()) => {
                    info!(attempt, "headscale is ready");
                    return PollOutcome::Ready { attempts: attempt };
                }
                Err(err) => {
                    debug!(attempt, error = %err, "headscale not answering yet");
                }
            }
            if attempt < self.budget {
                tokio::time::sleep(self.interval).await;
            }
        }
        PollOutcome::TimedOut {
            attempts: self.budget,
        }
    }
}
