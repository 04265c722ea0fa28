//! Bridge from host session events to registry calls
//!
//! The host runtime owns connections and reward sources; this bridge
//! translates its event stream 1:1 into registry operations. Nothing
//! here is fatal: an event for an actor with no party is normal traffic.

use crate::registry::PartyRegistry;
use crate::reward::LevelSource;
use party_types::ActorId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events supplied by the host session runtime
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An actor connected (or reconnected)
    Connected(ActorId),

    /// An actor disconnected
    Disconnected(ActorId),

    /// An actor earned a reward of the given base amount
    RewardEarned { actor: ActorId, amount: f64 },
}

/// Translates host session events into registry calls
pub struct SessionEventBridge {
    registry: Arc<PartyRegistry>,
    levels: Arc<dyn LevelSource + Send + Sync>,
}

impl SessionEventBridge {
    pub fn new(registry: Arc<PartyRegistry>, levels: Arc<dyn LevelSource + Send + Sync>) -> Self {
        Self { registry, levels }
    }

    /// Consume the host event stream until it closes
    pub async fn run(self, mut events: mpsc::Receiver<SessionEvent>) {
        info!("Session event bridge started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("Session event stream closed");
    }

    /// Apply a single host event
    pub fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected(actor) => {
                debug!(actor = %actor, "Actor connected");
                self.registry.actor_connected(&actor);
            }
            SessionEvent::Disconnected(actor) => {
                debug!(actor = %actor, "Actor disconnected");
                self.registry.actor_disconnected(&actor);
            }
            SessionEvent::RewardEarned { actor, amount } => {
                self.registry
                    .reward_earned(&actor, amount, self.levels.as_ref());
            }
        }
    }
}
