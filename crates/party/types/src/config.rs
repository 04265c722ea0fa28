//! Configuration for the party layer
//!
//! Loaded by the host at startup and swappable on demand via the
//! registry's `reload`. Invalid values (e.g. a zero max size) are the
//! loader's problem; this core treats the struct as already validated.

use serde::{Deserialize, Serialize};

/// Policy controlling whether/how rewards earned by one member are
/// redistributed to the others
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// No redistribution; the earner keeps their gain
    #[default]
    None,
    /// Every other member receives the same modified share
    Equal,
    /// Like `Equal`, scaled by the level gap between earner and member
    Weighted,
}

impl ShareMode {
    pub fn is_sharing(&self) -> bool {
        !matches!(self, ShareMode::None)
    }
}

/// Main configuration for the party layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartiesConfig {
    /// Reward sharing policy
    #[serde(default)]
    pub share_mode: ShareMode,

    /// Remove members from their party when they disconnect
    #[serde(default)]
    pub remove_on_dc: bool,

    /// Transfer leadership to the longest-tenured member when the
    /// leader departs; otherwise the seat stays vacant
    #[serde(default = "default_true")]
    pub new_leader_on_dc: bool,

    /// Only the leader may invite new members
    #[serde(default = "default_true")]
    pub only_leader_invites: bool,

    /// Carried for the external status-board renderer
    #[serde(default)]
    pub use_scoreboard: bool,

    /// Show levels instead of health on the status board
    #[serde(default)]
    pub level_scoreboard: bool,

    /// Share granted to non-earning members, as a fraction of the base amount
    #[serde(default = "default_member_modifier")]
    pub member_modifier: f64,

    /// Per-level bonus (or penalty, if negative) applied to the level gap
    /// between earner and member under `Weighted` sharing
    #[serde(default)]
    pub level_modifier: f64,

    /// How long an invitation lasts before the sweep expires it
    #[serde(default = "default_invite_timeout")]
    pub invite_timeout_secs: u64,

    /// Maximum party size, leader included
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Emit extra diagnostics for the external front end
    #[serde(default)]
    pub debug_messages: bool,
}

impl PartiesConfig {
    /// The invite timeout as a chrono duration
    pub fn invite_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.invite_timeout_secs as i64)
    }
}

impl Default for PartiesConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::None,
            remove_on_dc: false,
            new_leader_on_dc: true,
            only_leader_invites: true,
            use_scoreboard: false,
            level_scoreboard: false,
            member_modifier: default_member_modifier(),
            level_modifier: 0.0,
            invite_timeout_secs: default_invite_timeout(),
            max_size: default_max_size(),
            debug_messages: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_member_modifier() -> f64 {
    1.0
}

fn default_invite_timeout() -> u64 {
    30
}

fn default_max_size() -> usize {
    4
}
