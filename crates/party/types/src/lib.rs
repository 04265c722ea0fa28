//! Party Coordination Domain Types
//!
//! This crate defines the domain types for session parties: transient
//! groups of actors that share invitations, chat, and earned rewards.
//!
//! # Key Concepts
//!
//! - **Party**: a session-scoped group with exactly one (possibly vacant)
//!   leader seat, a bounded member roster, and a set of pending invitations.
//! - **Invitation**: a time-limited offer to join one specific party.
//!   An actor holds at most one pending invitation across all parties.
//! - **Share mode**: policy controlling whether rewards earned by one member
//!   are redistributed to the others, and how.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. All types
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display`, `generate()`, and `new()`.

#![deny(unsafe_code)]

mod actor;
mod config;
mod errors;
mod events;
mod party;

pub use actor::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use party::*;
