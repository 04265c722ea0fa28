//! Party records: who belongs, who is invited
//!
//! These are the storage shapes for a single party. They do NOT make
//! decisions; the state machine that enforces the invariants lives in
//! the runtime crate.

use crate::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a party
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl PartyId {
    /// Generate a new random PartyId
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create a PartyId from a known string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Short display form (first 8 chars)
    pub fn short(&self) -> String {
        self.0.chars().take(8).collect()
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record for a single party member
///
/// Records are kept in join order; the earliest record is the
/// longest-tenured member, which decides leadership succession.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberRecord {
    /// The member's identity
    pub actor_id: ActorId,
    /// When the member joined the party
    pub joined_at: DateTime<Utc>,
    /// Whether the host session currently reports the actor connected
    pub online: bool,
}

impl MemberRecord {
    /// Create a new member record, online by default
    pub fn new(actor_id: ActorId, joined_at: DateTime<Utc>) -> Self {
        Self {
            actor_id,
            joined_at,
            online: true,
        }
    }
}

/// A pending, time-limited offer for an actor to join a party
///
/// Unique per (party, invitee); re-inviting the same actor replaces
/// `issued_at` rather than stacking a second invitation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// The actor being invited
    pub invitee: ActorId,
    /// When the invitation was issued
    pub issued_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(invitee: ActorId, issued_at: DateTime<Utc>) -> Self {
        Self { invitee, issued_at }
    }

    /// Whether the invitation has outlived `timeout` as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.issued_at + timeout <= now
    }
}

/// A point-in-time snapshot of a party, for external rendering
///
/// Produced for the `info` query; the core never renders it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartyRoster {
    /// The party this snapshot describes
    pub party_id: PartyId,
    /// The current leader, if the seat is filled
    pub leader: Option<ActorId>,
    /// Members in join order
    pub members: Vec<RosterEntry>,
    /// Actors with a pending invitation
    pub invited: Vec<ActorId>,
}

/// One member line of a roster snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub actor_id: ActorId,
    pub online: bool,
}
