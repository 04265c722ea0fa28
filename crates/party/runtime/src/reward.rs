//! Reward sharing
//!
//! The whole formula lives behind [`share_rewards`] so it can be swapped
//! without touching the membership state machine. Amounts are computed
//! independently per member; there is no shared pool to deplete, and the
//! earner's own gain is never reduced; other members receive additive
//! grants on top of it.

use party_types::{ActorId, MemberRecord, PartiesConfig, ShareMode};
use std::collections::HashMap;

/// Supplies the current level of an actor
///
/// Provided by the host per call; levels change mid-session, so the
/// computation never caches them.
pub trait LevelSource {
    fn level_of(&self, actor: &ActorId) -> i32;
}

impl<F> LevelSource for F
where
    F: Fn(&ActorId) -> i32,
{
    fn level_of(&self, actor: &ActorId) -> i32 {
        self(actor)
    }
}

/// Compute the awarded amount per member for a reward earned by `earner`
///
/// ```text
/// awarded(m) = base * member_factor(m) * level_factor(m)
/// member_factor(m) = 1.0 when m is the earner, else member_modifier
/// level_factor(m)  = 1.0 + level_modifier * (level(earner) - level(m))
///                    under Weighted sharing, else 1.0
/// ```
///
/// With sharing off (or an earner who is not a member) the result is just
/// the earner's unmodified amount. Non-finite or negative products clamp
/// to zero. Offline members are included; no exclusion flag exists.
pub fn share_rewards(
    members: &[MemberRecord],
    earner: &ActorId,
    base_amount: f64,
    config: &PartiesConfig,
    levels: &dyn LevelSource,
) -> HashMap<ActorId, f64> {
    let earner_is_member = members.iter().any(|m| &m.actor_id == earner);
    if !config.share_mode.is_sharing() || !earner_is_member {
        let mut awards = HashMap::with_capacity(1);
        awards.insert(earner.clone(), clamp(base_amount));
        return awards;
    }

    let earner_level = match config.share_mode {
        ShareMode::Weighted => levels.level_of(earner),
        _ => 0,
    };

    let mut awards = HashMap::with_capacity(members.len());
    for member in members {
        let member_factor = if &member.actor_id == earner {
            1.0
        } else {
            config.member_modifier
        };
        let level_factor = match config.share_mode {
            ShareMode::Weighted => {
                let gap = earner_level - levels.level_of(&member.actor_id);
                1.0 + config.level_modifier * gap as f64
            }
            _ => 1.0,
        };
        awards.insert(
            member.actor_id.clone(),
            clamp(base_amount * member_factor * level_factor),
        );
    }
    awards
}

fn clamp(amount: f64) -> f64 {
    if !amount.is_finite() || amount < 0.0 {
        0.0
    } else {
        amount
    }
}
