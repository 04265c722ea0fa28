//! Periodic invitation sweep
//!
//! One background task, fixed period (independent of the configured
//! invite timeout), asking the registry to expire stale invitations
//! across all parties. Stopping is graceful: the sweep in progress
//! finishes, then the task exits on the next tick.

use crate::registry::PartyRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Default sweep period; fine-grained enough for any sane invite timeout
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Background task that expires stale invitations
pub struct InviteSweeper {
    registry: Arc<PartyRegistry>,
    period: Duration,
    running: Arc<RwLock<bool>>,
}

impl InviteSweeper {
    /// Create a sweeper with the default one-second period
    pub fn new(registry: Arc<PartyRegistry>) -> Self {
        Self::with_period(registry, DEFAULT_SWEEP_PERIOD)
    }

    /// Create a sweeper with a custom period
    pub fn with_period(registry: Arc<PartyRegistry>, period: Duration) -> Self {
        Self {
            registry,
            period,
            running: Arc::new(RwLock::new(true)),
        }
    }

    /// Spawn the sweep loop
    ///
    /// Each sweep runs to completion before the stop flag is consulted, so
    /// a party is never left partially expired.
    pub fn spawn(&self) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let running = self.running.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, "Invite sweep started");

            loop {
                ticker.tick().await;

                if !*running.read().await {
                    break;
                }
                registry.sweep_expired_invitations(registry.now());
            }

            info!("Invite sweep stopped");
        })
    }

    /// Request a graceful stop; the task exits after the current sweep
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }
}
