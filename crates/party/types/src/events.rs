//! Events emitted by the party registry
//!
//! These are the outputs the core produces for external rendering:
//! roster changes, expired invitations, reward grants, party chat.
//! The registry broadcasts them; front ends subscribe and present.

use crate::{ActorId, PartyId};
use serde::{Deserialize, Serialize};

/// Events emitted by the party registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PartyEvent {
    /// A new party was formed.
    PartyFormed { party_id: PartyId, leader: ActorId },

    /// A party was destroyed (last member left or disconnected).
    PartyDisbanded { party_id: PartyId },

    /// An invitation was issued.
    InviteSent {
        party_id: PartyId,
        inviter: ActorId,
        invitee: ActorId,
    },

    /// An invitee declined.
    InviteDeclined { party_id: PartyId, invitee: ActorId },

    /// The sweep expired a stale invitation.
    InviteExpired { party_id: PartyId, invitee: ActorId },

    /// An invitee accepted and joined.
    MemberJoined { party_id: PartyId, actor_id: ActorId },

    /// A member left or was removed on disconnect.
    MemberLeft { party_id: PartyId, actor_id: ActorId },

    /// Leadership moved to another member.
    LeaderChanged {
        party_id: PartyId,
        new_leader: ActorId,
    },

    /// A member was granted a share of an earned reward.
    RewardShared {
        party_id: PartyId,
        actor_id: ActorId,
        amount: f64,
    },

    /// A member sent a message to their party.
    ChatMessage {
        party_id: PartyId,
        sender: ActorId,
        text: String,
    },

    /// An actor flipped their party-chat toggle.
    ChatToggled { actor_id: ActorId, enabled: bool },
}
