//! Party Coordination Runtime
//!
//! This crate provides the runtime implementation for session parties:
//! transient groups of actors with time-limited invitations, leadership
//! transfer, and a shared-reward redistribution policy.
//!
//! # Architecture
//!
//! The [`PartyRegistry`] is the main entry point. It owns every live
//! [`Party`], resolves actors to the party they belong to (or are invited
//! to) through a maintained index, and is the only component allowed to
//! create or destroy parties:
//!
//! - [`Party`]: Membership/invitation state machine for one party
//! - [`PartyRegistry`]: Global ownership, actor index, chat toggles, events
//! - [`InviteSweeper`]: Periodic background sweep that expires stale invitations
//! - [`SessionEventBridge`]: Translates host connect/disconnect/reward events
//! - [`reward`]: The pure reward-sharing computation
//! - [`Clock`]: Substitutable process-wide wall clock
//!
//! # Key Invariants
//!
//! 1. An actor is a member of at most one party and invited by at most one
//! 2. A party never exceeds the configured max size
//! 3. The leader, when the seat is filled, is always a current member
//! 4. Expiring an invitation and accepting it are mutually exclusive outcomes
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use party_runtime::{PartyRegistry, SystemClock};
//! use party_types::{ActorId, PartiesConfig};
//!
//! let registry = PartyRegistry::new(PartiesConfig::default(), Arc::new(SystemClock));
//!
//! // A party-less inviter implicitly forms a party of one
//! let party_id = registry
//!     .invite(&ActorId::new("alice"), ActorId::new("bob"))
//!     .unwrap();
//! registry.accept(&ActorId::new("bob")).unwrap();
//!
//! assert!(registry.find_party_of(&ActorId::new("bob")).is_some());
//! # let _ = party_id;
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod party;
pub mod registry;
pub mod reward;
pub mod session;
pub mod sweeper;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use party::{ExpiredInvites, Party};
pub use registry::PartyRegistry;
pub use reward::LevelSource;
pub use session::{SessionEvent, SessionEventBridge};
pub use sweeper::InviteSweeper;
