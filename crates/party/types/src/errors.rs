//! Error types for the party layer

use crate::{ActorId, PartyId};

/// Errors that can occur in party operations
///
/// All of these are recoverable and reported back to the invoking
/// collaborator for user-facing messaging; none are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum PartyError {
    #[error("Actor is not a member of the party: {0}")]
    NotMember(ActorId),

    #[error("Only the party leader may do that: {0}")]
    NotLeader(ActorId),

    #[error("Actor is already a member of the party: {0}")]
    AlreadyMember(ActorId),

    #[error("Actor already belongs to or is invited to a party: {0}")]
    AlreadyInParty(ActorId),

    #[error("Party is full: {current}/{max} members")]
    Full { current: usize, max: usize },

    #[error("No pending invitation for actor: {0}")]
    NoSuchInvitation(ActorId),

    #[error("Party not found: {0}")]
    PartyNotFound(PartyId),
}

/// Result type alias for party operations
pub type PartyResult<T> = Result<T, PartyError>;
