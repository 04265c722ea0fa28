//! The per-party membership/invitation state machine
//!
//! A `Party` enforces its local invariants (size bound, leader-is-member,
//! invitee-is-not-member) and nothing more. Global uniqueness (an actor in
//! at most one party, invited by at most one) belongs to the registry.
//!
//! All operations are synchronous and complete without suspension; the
//! registry serializes them behind a per-party mutex.

use crate::reward::{self, LevelSource};
use chrono::{DateTime, Duration, Utc};
use party_types::{
    ActorId, Invitation, MemberRecord, PartiesConfig, PartyError, PartyId, PartyResult,
    PartyRoster, RosterEntry,
};
use std::collections::HashMap;

/// One live party: a leader seat, a bounded member roster, and the
/// pending invitations into it
#[derive(Debug)]
pub struct Party {
    id: PartyId,
    /// Vacant only after a leader departs with leadership transfer disabled
    leader: Option<ActorId>,
    /// Join order; the front-most (earliest `joined_at`) member is the
    /// longest-tenured and first in line for leadership
    members: Vec<MemberRecord>,
    invitations: HashMap<ActorId, Invitation>,
}

impl Party {
    /// Create a party of one, the founder taking the leader seat
    pub fn new(id: PartyId, founder: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            leader: Some(founder.clone()),
            members: vec![MemberRecord::new(founder, now)],
            invitations: HashMap::new(),
        }
    }

    /// Issue (or refresh) an invitation
    ///
    /// Order of checks follows the operation contract: leader gate first,
    /// then membership of the inviter, then state of the invitee, then
    /// capacity. Re-inviting a pending invitee replaces `issued_at`.
    pub fn invite(
        &mut self,
        inviter: &ActorId,
        invitee: ActorId,
        now: DateTime<Utc>,
        config: &PartiesConfig,
    ) -> PartyResult<Invitation> {
        if config.only_leader_invites && self.leader.as_ref() != Some(inviter) {
            // A leaderless party cannot invite under this flag
            return Err(PartyError::NotLeader(inviter.clone()));
        }
        if !self.is_member(inviter) {
            return Err(PartyError::NotMember(inviter.clone()));
        }
        if self.is_member(&invitee) {
            return Err(PartyError::AlreadyMember(invitee));
        }
        if self.members.len() >= config.max_size {
            return Err(PartyError::Full {
                current: self.members.len(),
                max: config.max_size,
            });
        }

        let invitation = Invitation::new(invitee.clone(), now);
        self.invitations.insert(invitee, invitation.clone());
        Ok(invitation)
    }

    /// Accept a pending invitation, joining the party
    ///
    /// An invitation past its timeout is treated as already gone: it is
    /// dropped here and the accept fails, so whichever of accept and sweep
    /// runs first for an invitee wins and the loser sees `NoSuchInvitation`.
    pub fn accept(
        &mut self,
        invitee: ActorId,
        now: DateTime<Utc>,
        config: &PartiesConfig,
    ) -> PartyResult<()> {
        let invitation = self
            .invitations
            .get(&invitee)
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))?;

        if invitation.is_expired(now, config.invite_timeout()) {
            self.invitations.remove(&invitee);
            return Err(PartyError::NoSuchInvitation(invitee));
        }

        // Capacity may have been reached since the invite was issued.
        // The invitation stays pending; the sweep will collect it.
        if self.members.len() >= config.max_size {
            return Err(PartyError::Full {
                current: self.members.len(),
                max: config.max_size,
            });
        }

        self.invitations.remove(&invitee);
        self.members.push(MemberRecord::new(invitee, now));
        Ok(())
    }

    /// Decline a pending invitation; no other side effect
    pub fn decline(&mut self, invitee: &ActorId) -> PartyResult<()> {
        self.invitations
            .remove(invitee)
            .map(|_| ())
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))
    }

    /// Remove a member
    ///
    /// When the departing member held the leader seat and members remain,
    /// leadership passes to the longest-tenured remaining member if
    /// `new_leader_on_dc` is set; otherwise the seat stays vacant until an
    /// external authority calls [`Party::set_leader`]. Returns the new
    /// leader when a transfer happened.
    pub fn leave(&mut self, member: &ActorId, config: &PartiesConfig) -> PartyResult<Option<ActorId>> {
        let position = self
            .members
            .iter()
            .position(|m| &m.actor_id == member)
            .ok_or_else(|| PartyError::NotMember(member.clone()))?;
        self.members.remove(position);

        if self.leader.as_ref() != Some(member) {
            return Ok(None);
        }

        if config.new_leader_on_dc && !self.members.is_empty() {
            // Earliest joined_at wins; min_by_key keeps join order on ties
            let successor = self
                .members
                .iter()
                .min_by_key(|m| m.joined_at)
                .map(|m| m.actor_id.clone());
            self.leader = successor.clone();
            Ok(successor)
        } else {
            self.leader = None;
            Ok(None)
        }
    }

    /// Assign the leader seat (external authority; the actor must be a member)
    pub fn set_leader(&mut self, actor: ActorId) -> PartyResult<()> {
        if !self.is_member(&actor) {
            return Err(PartyError::NotMember(actor));
        }
        self.leader = Some(actor);
        Ok(())
    }

    /// Drain invitations that have outlived `timeout` as of `now`
    ///
    /// Returns an iterator over the expired invitees in ascending
    /// `issued_at` order; each one is removed from the pending set as it
    /// is yielded. Invitations left unyielded stay pending.
    pub fn check_invitations(
        &mut self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> ExpiredInvites<'_> {
        let mut expired: Vec<(DateTime<Utc>, ActorId)> = self
            .invitations
            .values()
            .filter(|inv| inv.is_expired(now, timeout))
            .map(|inv| (inv.issued_at, inv.invitee.clone()))
            .collect();
        expired.sort_by_key(|(issued_at, _)| *issued_at);

        ExpiredInvites {
            party: self,
            queue: expired.into_iter(),
        }
    }

    /// Compute the reward split for a reward earned by `earner`
    pub fn distribute_reward(
        &self,
        earner: &ActorId,
        base_amount: f64,
        config: &PartiesConfig,
        levels: &dyn LevelSource,
    ) -> HashMap<ActorId, f64> {
        reward::share_rewards(&self.members, earner, base_amount, config, levels)
    }

    /// Update a member's connection status; true if the member was found
    pub fn set_online(&mut self, actor: &ActorId, online: bool) -> bool {
        match self.members.iter_mut().find(|m| &m.actor_id == actor) {
            Some(member) => {
                member.online = online;
                true
            }
            None => false,
        }
    }

    /// Snapshot for external rendering
    pub fn roster(&self) -> PartyRoster {
        PartyRoster {
            party_id: self.id.clone(),
            leader: self.leader.clone(),
            members: self
                .members
                .iter()
                .map(|m| RosterEntry {
                    actor_id: m.actor_id.clone(),
                    online: m.online,
                })
                .collect(),
            invited: self.invitations.keys().cloned().collect(),
        }
    }

    // --- Queries ---

    pub fn id(&self) -> &PartyId {
        &self.id
    }

    pub fn leader(&self) -> Option<&ActorId> {
        self.leader.as_ref()
    }

    pub fn is_member(&self, actor: &ActorId) -> bool {
        self.members.iter().any(|m| &m.actor_id == actor)
    }

    pub fn is_invited(&self, actor: &ActorId) -> bool {
        self.invitations.contains_key(actor)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[MemberRecord] {
        &self.members
    }

    pub fn invited_actors(&self) -> Vec<ActorId> {
        self.invitations.keys().cloned().collect()
    }
}

/// Draining iterator over expired invitations, ascending by issue time
///
/// Produced by [`Party::check_invitations`]. Each call to `next` removes
/// the yielded invitee from the party's pending set.
pub struct ExpiredInvites<'a> {
    party: &'a mut Party,
    queue: std::vec::IntoIter<(DateTime<Utc>, ActorId)>,
}

impl Iterator for ExpiredInvites<'_> {
    type Item = ActorId;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, invitee) = self.queue.next()?;
        self.party.invitations.remove(&invitee);
        Some(invitee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Party, PartiesConfig, DateTime<Utc>) {
        let now = Utc::now();
        let party = Party::new(PartyId::generate(), ActorId::new("alice"), now);
        (party, PartiesConfig::default(), now)
    }

    fn join(party: &mut Party, actor: &str, now: DateTime<Utc>, config: &PartiesConfig) {
        party
            .invite(&ActorId::new("alice"), ActorId::new(actor), now, config)
            .unwrap();
        party.accept(ActorId::new(actor), now, config).unwrap();
    }

    #[test]
    fn test_founder_is_leader_and_member() {
        let (party, _, _) = setup();
        assert_eq!(party.leader(), Some(&ActorId::new("alice")));
        assert!(party.is_member(&ActorId::new("alice")));
        assert_eq!(party.member_count(), 1);
    }

    #[test]
    fn test_invite_accept_joins() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        assert!(party.is_invited(&ActorId::new("bob")));

        party.accept(ActorId::new("bob"), now, &config).unwrap();
        assert!(party.is_member(&ActorId::new("bob")));
        assert!(!party.is_invited(&ActorId::new("bob")));
        assert_eq!(party.member_count(), 2);
    }

    #[test]
    fn test_only_leader_invites() {
        let (mut party, config, now) = setup();
        join(&mut party, "bob", now, &config);

        let result = party.invite(&ActorId::new("bob"), ActorId::new("carol"), now, &config);
        assert!(matches!(result, Err(PartyError::NotLeader(_))));

        // With the gate off, any member may invite
        let open = PartiesConfig {
            only_leader_invites: false,
            ..Default::default()
        };
        party
            .invite(&ActorId::new("bob"), ActorId::new("carol"), now, &open)
            .unwrap();
    }

    #[test]
    fn test_non_member_cannot_invite() {
        let (mut party, _, now) = setup();
        let open = PartiesConfig {
            only_leader_invites: false,
            ..Default::default()
        };
        let result = party.invite(&ActorId::new("mallory"), ActorId::new("bob"), now, &open);
        assert!(matches!(result, Err(PartyError::NotMember(_))));
    }

    #[test]
    fn test_invite_existing_member() {
        let (mut party, config, now) = setup();
        join(&mut party, "bob", now, &config);

        let result = party.invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config);
        assert!(matches!(result, Err(PartyError::AlreadyMember(_))));
    }

    #[test]
    fn test_invite_at_capacity_fails() {
        let (mut party, _, now) = setup();
        let config = PartiesConfig {
            max_size: 2,
            ..Default::default()
        };
        join(&mut party, "bob", now, &config);

        let result = party.invite(&ActorId::new("alice"), ActorId::new("carol"), now, &config);
        assert!(matches!(result, Err(PartyError::Full { current: 2, max: 2 })));
    }

    #[test]
    fn test_accept_after_capacity_reached_fails() {
        let (mut party, _, now) = setup();
        let config = PartiesConfig {
            max_size: 2,
            ..Default::default()
        };
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        party
            .invite(&ActorId::new("alice"), ActorId::new("carol"), now, &config)
            .unwrap();

        party.accept(ActorId::new("bob"), now, &config).unwrap();
        let result = party.accept(ActorId::new("carol"), now, &config);
        assert!(matches!(result, Err(PartyError::Full { .. })));
        // The invitation stays pending for the sweep
        assert!(party.is_invited(&ActorId::new("carol")));
    }

    #[test]
    fn test_reinvite_refreshes_issued_at() {
        let (mut party, config, now) = setup();
        let first = party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        let later = now + Duration::seconds(20);
        let second = party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), later, &config)
            .unwrap();

        assert_eq!(first.issued_at, now);
        assert_eq!(second.issued_at, later);
        // Fresh again: accepting at later + 20s succeeds under a 30s timeout
        party
            .accept(ActorId::new("bob"), later + Duration::seconds(20), &config)
            .unwrap();
    }

    #[test]
    fn test_accept_within_timeout_succeeds() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        party
            .accept(ActorId::new("bob"), now + Duration::seconds(29), &config)
            .unwrap();
    }

    #[test]
    fn test_accept_after_timeout_fails() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();

        let result = party.accept(ActorId::new("bob"), now + Duration::seconds(31), &config);
        assert!(matches!(result, Err(PartyError::NoSuchInvitation(_))));
        // The stale entry is gone too
        assert!(!party.is_invited(&ActorId::new("bob")));
    }

    #[test]
    fn test_decline_is_not_idempotent() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();

        party.decline(&ActorId::new("bob")).unwrap();
        assert_eq!(party.member_count(), 1);
        assert!(!party.is_invited(&ActorId::new("bob")));

        let again = party.decline(&ActorId::new("bob"));
        assert!(matches!(again, Err(PartyError::NoSuchInvitation(_))));
    }

    #[test]
    fn test_leader_leave_transfers_to_longest_tenured() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        party
            .accept(ActorId::new("bob"), now + Duration::seconds(1), &config)
            .unwrap();
        party
            .invite(&ActorId::new("alice"), ActorId::new("carol"), now, &config)
            .unwrap();
        party
            .accept(ActorId::new("carol"), now + Duration::seconds(2), &config)
            .unwrap();

        let new_leader = party.leave(&ActorId::new("alice"), &config).unwrap();
        assert_eq!(new_leader, Some(ActorId::new("bob")));
        assert_eq!(party.leader(), Some(&ActorId::new("bob")));
    }

    #[test]
    fn test_leader_leave_without_transfer_vacates_seat() {
        let (mut party, _, now) = setup();
        let config = PartiesConfig {
            new_leader_on_dc: false,
            ..Default::default()
        };
        join(&mut party, "bob", now, &config);

        party.leave(&ActorId::new("alice"), &config).unwrap();
        assert_eq!(party.leader(), None);

        // Leaderless party cannot invite under only_leader_invites
        let result = party.invite(&ActorId::new("bob"), ActorId::new("carol"), now, &config);
        assert!(matches!(result, Err(PartyError::NotLeader(_))));

        // Until an external authority reassigns the seat
        party.set_leader(ActorId::new("bob")).unwrap();
        party
            .invite(&ActorId::new("bob"), ActorId::new("carol"), now, &config)
            .unwrap();
    }

    #[test]
    fn test_non_leader_leave_keeps_leader() {
        let (mut party, config, now) = setup();
        join(&mut party, "bob", now, &config);

        party.leave(&ActorId::new("bob"), &config).unwrap();
        assert_eq!(party.leader(), Some(&ActorId::new("alice")));
        assert_eq!(party.member_count(), 1);
    }

    #[test]
    fn test_leave_not_member() {
        let (mut party, config, _) = setup();
        let result = party.leave(&ActorId::new("mallory"), &config);
        assert!(matches!(result, Err(PartyError::NotMember(_))));
    }

    #[test]
    fn test_last_leave_empties_party() {
        let (mut party, config, _) = setup();
        party.leave(&ActorId::new("alice"), &config).unwrap();
        assert!(party.is_empty());
        assert_eq!(party.leader(), None);
    }

    #[test]
    fn test_check_invitations_ordering_and_removal() {
        let (mut party, config, now) = setup();
        // Issued out of order on purpose
        party
            .invite(
                &ActorId::new("alice"),
                ActorId::new("late"),
                now + Duration::seconds(10),
                &config,
            )
            .unwrap();
        party
            .invite(&ActorId::new("alice"), ActorId::new("early"), now, &config)
            .unwrap();
        party
            .invite(
                &ActorId::new("alice"),
                ActorId::new("fresh"),
                now + Duration::seconds(25),
                &config,
            )
            .unwrap();

        let expired: Vec<ActorId> = party
            .check_invitations(now + Duration::seconds(40), Duration::seconds(30))
            .collect();
        assert_eq!(expired, vec![ActorId::new("early"), ActorId::new("late")]);
        assert!(!party.is_invited(&ActorId::new("early")));
        assert!(!party.is_invited(&ActorId::new("late")));
        assert!(party.is_invited(&ActorId::new("fresh")));
    }

    #[test]
    fn test_check_invitations_partial_consumption() {
        let (mut party, config, now) = setup();
        party
            .invite(&ActorId::new("alice"), ActorId::new("bob"), now, &config)
            .unwrap();
        party
            .invite(
                &ActorId::new("alice"),
                ActorId::new("carol"),
                now + Duration::seconds(1),
                &config,
            )
            .unwrap();

        let later = now + Duration::minutes(5);
        let mut expired = party.check_invitations(later, Duration::seconds(30));
        assert_eq!(expired.next(), Some(ActorId::new("bob")));
        drop(expired);

        // The unyielded invitation stays pending until the next call
        assert!(party.is_invited(&ActorId::new("carol")));
        let rest: Vec<ActorId> = party
            .check_invitations(later, Duration::seconds(30))
            .collect();
        assert_eq!(rest, vec![ActorId::new("carol")]);
    }

    #[test]
    fn test_set_online() {
        let (mut party, config, now) = setup();
        join(&mut party, "bob", now, &config);

        assert!(party.set_online(&ActorId::new("bob"), false));
        assert!(!party.members()[1].online);
        assert!(!party.set_online(&ActorId::new("mallory"), false));
    }

    #[test]
    fn test_roster_snapshot() {
        let (mut party, config, now) = setup();
        join(&mut party, "bob", now, &config);
        party
            .invite(&ActorId::new("alice"), ActorId::new("carol"), now, &config)
            .unwrap();

        let roster = party.roster();
        assert_eq!(roster.leader, Some(ActorId::new("alice")));
        assert_eq!(roster.members.len(), 2);
        assert_eq!(roster.invited, vec![ActorId::new("carol")]);
    }
}
