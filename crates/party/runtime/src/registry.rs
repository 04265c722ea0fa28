//! The party registry
//!
//! Owns every live party and is the only component allowed to create or
//! destroy one. Resolves an actor to their party through a maintained
//! actor index (members and invitees alike), enforces the global
//! uniqueness invariant, holds the per-actor chat-toggle store, and
//! broadcasts events for external rendering.
//!
//! # Locking
//!
//! Each party sits behind its own mutex; all mutations to one party are
//! serialized, distinct parties proceed concurrently. Index entries for an
//! actor change only while the owning party's mutex is held, so index and
//! party state move together. Registry-level create claims the founder's
//! index entry through the map's entry API, which is the serialization
//! point for the uniqueness invariant. No operation here ever awaits, and
//! shard guards from the party table are always dropped before a party
//! mutex is taken.

use crate::clock::Clock;
use crate::party::Party;
use crate::reward::LevelSource;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use party_types::{
    ActorId, PartiesConfig, PartyError, PartyEvent, PartyId, PartyResult, PartyRoster,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Registry of all live parties
pub struct PartyRegistry {
    /// All live parties, keyed by id
    parties: DashMap<PartyId, Arc<Mutex<Party>>>,

    /// Actor to the party they belong to or are invited to
    index: DashMap<ActorId, PartyId>,

    /// Actors with party chat toggled on; independent of membership,
    /// cleared only by [`PartyRegistry::clear`]
    toggled: DashMap<ActorId, ()>,

    /// Current configuration, swappable via reload
    config: RwLock<PartiesConfig>,

    /// Shared wall clock
    clock: Arc<dyn Clock>,

    /// Event broadcaster for external rendering
    event_tx: broadcast::Sender<PartyEvent>,
}

impl PartyRegistry {
    /// Create a new registry
    pub fn new(config: PartiesConfig, clock: Arc<dyn Clock>) -> Self {
        let (event_tx, _) = broadcast::channel(1024);

        Self {
            parties: DashMap::new(),
            index: DashMap::new(),
            toggled: DashMap::new(),
            config: RwLock::new(config),
            clock,
            event_tx,
        }
    }

    /// Subscribe to registry events
    pub fn subscribe(&self) -> broadcast::Receiver<PartyEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> PartiesConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a freshly loaded configuration; applies to subsequent operations
    pub fn reload(&self, config: PartiesConfig) {
        info!(max_size = config.max_size, share_mode = ?config.share_mode, "Configuration reloaded");
        *self
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// The registry's clock reading
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // --- Party lifecycle ---

    /// Create a new party with `initial_leader` as its only member
    ///
    /// Fails with `AlreadyInParty` if the actor is already a member or
    /// invitee of an existing party.
    pub fn create_party(&self, initial_leader: ActorId) -> PartyResult<PartyId> {
        let party_id = match self.index.entry(initial_leader.clone()) {
            Entry::Occupied(_) => {
                return Err(PartyError::AlreadyInParty(initial_leader));
            }
            Entry::Vacant(entry) => {
                let party_id = PartyId::generate();
                let party = Party::new(party_id.clone(), initial_leader.clone(), self.now());
                self.parties
                    .insert(party_id.clone(), Arc::new(Mutex::new(party)));
                entry.insert(party_id.clone());
                party_id
            }
        };

        info!(party = %party_id.short(), leader = %initial_leader, "Party formed");
        self.emit(PartyEvent::PartyFormed {
            party_id: party_id.clone(),
            leader: initial_leader,
        });
        Ok(party_id)
    }

    /// The party the actor is a member of, if any
    pub fn find_party_of(&self, actor: &ActorId) -> Option<PartyId> {
        let party_id = self.index.get(actor).map(|entry| entry.value().clone())?;
        let party = self.party_ref(&party_id)?;
        let guard = lock(&party);
        guard.is_member(actor).then_some(party_id)
    }

    /// The party the actor is a member of or invited to, if any
    pub fn find_party_of_or_invited(&self, actor: &ActorId) -> Option<PartyId> {
        self.index.get(actor).map(|entry| entry.value().clone())
    }

    /// Remove a party outright; silent no-op if it does not exist
    pub fn remove_party(&self, party_id: &PartyId) {
        let Some(party) = self.party_ref(party_id) else {
            return;
        };
        let guard = lock(&party);
        for member in guard.members() {
            self.index.remove(&member.actor_id);
        }
        for invitee in guard.invited_actors() {
            self.index.remove(&invitee);
        }
        drop(guard);
        self.parties.remove(party_id);

        info!(party = %party_id.short(), "Party removed");
        self.emit(PartyEvent::PartyDisbanded {
            party_id: party_id.clone(),
        });
    }

    // --- Membership and invitation operations ---

    /// Invite `invitee` on behalf of `inviter`
    ///
    /// A party-less inviter implicitly forms a party of one first; that
    /// party persists even if the invite itself is then rejected. Returns
    /// the id of the inviting party.
    pub fn invite(&self, inviter: &ActorId, invitee: ActorId) -> PartyResult<PartyId> {
        let config = self.config();
        let party_id = match self.find_party_of_or_invited(inviter) {
            Some(party_id) => party_id,
            None => self.create_party(inviter.clone())?,
        };
        let party = self
            .party_ref(&party_id)
            .ok_or_else(|| PartyError::PartyNotFound(party_id.clone()))?;

        let mut guard = lock(&party);
        match self.index.entry(invitee.clone()) {
            Entry::Occupied(entry) if entry.get() == &party_id => {
                // Already tracked by this party: a pending invitee gets a
                // refreshed invitation, a member gets AlreadyMember
                guard.invite(inviter, invitee.clone(), self.now(), &config)?;
            }
            Entry::Occupied(_) => {
                return Err(PartyError::AlreadyInParty(invitee));
            }
            Entry::Vacant(entry) => {
                guard.invite(inviter, invitee.clone(), self.now(), &config)?;
                entry.insert(party_id.clone());
            }
        }
        drop(guard);

        debug!(party = %party_id.short(), inviter = %inviter, invitee = %invitee, "Invitation issued");
        self.emit(PartyEvent::InviteSent {
            party_id: party_id.clone(),
            inviter: inviter.clone(),
            invitee,
        });
        Ok(party_id)
    }

    /// Accept the pending invitation held by `invitee`
    pub fn accept(&self, invitee: &ActorId) -> PartyResult<PartyId> {
        let config = self.config();
        let party_id = self
            .find_party_of_or_invited(invitee)
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))?;
        let party = self
            .party_ref(&party_id)
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))?;

        let mut guard = lock(&party);
        match guard.accept(invitee.clone(), self.now(), &config) {
            Ok(()) => {}
            Err(err) => {
                // An expired invitation was dropped inside accept; the
                // index entry must not outlive it
                if !guard.is_invited(invitee) && !guard.is_member(invitee) {
                    self.index.remove(invitee);
                }
                return Err(err);
            }
        }
        drop(guard);

        info!(party = %party_id.short(), actor = %invitee, "Member joined");
        self.emit(PartyEvent::MemberJoined {
            party_id: party_id.clone(),
            actor_id: invitee.clone(),
        });
        Ok(party_id)
    }

    /// Decline the pending invitation held by `invitee`
    pub fn decline(&self, invitee: &ActorId) -> PartyResult<()> {
        let party_id = self
            .find_party_of_or_invited(invitee)
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))?;
        let party = self
            .party_ref(&party_id)
            .ok_or_else(|| PartyError::NoSuchInvitation(invitee.clone()))?;

        let mut guard = lock(&party);
        guard.decline(invitee)?;
        self.index.remove(invitee);
        drop(guard);

        debug!(party = %party_id.short(), invitee = %invitee, "Invitation declined");
        self.emit(PartyEvent::InviteDeclined {
            party_id,
            invitee: invitee.clone(),
        });
        Ok(())
    }

    /// Remove `member` from their party, destroying it if now empty
    pub fn leave(&self, member: &ActorId) -> PartyResult<()> {
        let config = self.config();
        let party_id = self
            .find_party_of_or_invited(member)
            .ok_or_else(|| PartyError::NotMember(member.clone()))?;
        let party = self
            .party_ref(&party_id)
            .ok_or_else(|| PartyError::NotMember(member.clone()))?;

        let mut guard = lock(&party);
        let new_leader = guard.leave(member, &config)?;
        self.index.remove(member);

        let disbanded = guard.is_empty();
        if disbanded {
            // Pending invitations die with the party
            for invitee in guard.invited_actors() {
                self.index.remove(&invitee);
            }
            self.parties.remove(&party_id);
        }
        drop(guard);

        info!(party = %party_id.short(), actor = %member, "Member left");
        self.emit(PartyEvent::MemberLeft {
            party_id: party_id.clone(),
            actor_id: member.clone(),
        });
        if let Some(new_leader) = new_leader {
            info!(party = %party_id.short(), leader = %new_leader, "Leadership transferred");
            self.emit(PartyEvent::LeaderChanged {
                party_id: party_id.clone(),
                new_leader,
            });
        }
        if disbanded {
            info!(party = %party_id.short(), "Party disbanded");
            self.emit(PartyEvent::PartyDisbanded { party_id });
        }
        Ok(())
    }

    // --- Background sweep ---

    /// Expire stale invitations across all parties
    ///
    /// Never mutates membership. Each party is swept under its own lock
    /// and in isolation: one party's trouble is logged and skipped, the
    /// rest of the sweep continues.
    pub fn sweep_expired_invitations(&self, now: DateTime<Utc>) {
        let timeout = self.config().invite_timeout();
        let party_ids: Vec<PartyId> = self.parties.iter().map(|e| e.key().clone()).collect();

        for party_id in party_ids {
            // The party may have been destroyed since the snapshot
            let Some(party) = self.party_ref(&party_id) else {
                continue;
            };
            let mut guard = match party.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!(party = %party_id.short(), "Skipping poisoned party in sweep");
                    drop(poisoned);
                    continue;
                }
            };
            let expired: Vec<ActorId> = guard.check_invitations(now, timeout).collect();
            for invitee in &expired {
                self.index.remove(invitee);
            }
            drop(guard);

            for invitee in expired {
                info!(party = %party_id.short(), invitee = %invitee, "Invitation expired");
                self.emit(PartyEvent::InviteExpired {
                    party_id: party_id.clone(),
                    invitee,
                });
            }
        }
    }

    // --- Rewards ---

    /// Distribute a reward earned by `earner` across their party
    ///
    /// Emits `RewardShared` for every member granted a share beyond the
    /// earner's own gain. An actor without a party simply keeps the base
    /// amount, mirroring the mode-off behavior.
    pub fn reward_earned(
        &self,
        earner: &ActorId,
        base_amount: f64,
        levels: &dyn LevelSource,
    ) -> HashMap<ActorId, f64> {
        let config = self.config();
        match self.find_party_of(earner) {
            Some(party_id) => {
                let Some(party) = self.party_ref(&party_id) else {
                    return crate::reward::share_rewards(&[], earner, base_amount, &config, levels);
                };
                let guard = lock(&party);
                let awards = guard.distribute_reward(earner, base_amount, &config, levels);
                drop(guard);

                for (actor_id, amount) in &awards {
                    if actor_id == earner {
                        continue;
                    }
                    if config.debug_messages {
                        debug!(party = %party_id.short(), actor = %actor_id, amount, "Reward share granted");
                    }
                    self.emit(PartyEvent::RewardShared {
                        party_id: party_id.clone(),
                        actor_id: actor_id.clone(),
                        amount: *amount,
                    });
                }
                awards
            }
            // No party: the earner keeps the base amount, as with sharing off
            None => crate::reward::share_rewards(&[], earner, base_amount, &config, levels),
        }
    }

    // --- Session events ---

    /// Host reported the actor connected; restores online status only
    pub fn actor_connected(&self, actor: &ActorId) {
        if let Some(party_id) = self.find_party_of(actor) {
            if let Some(party) = self.party_ref(&party_id) {
                lock(&party).set_online(actor, true);
            }
        }
    }

    /// Host reported the actor disconnected
    ///
    /// With `remove_on_dc` the actor leaves their party (which may disband
    /// it); otherwise they are only marked offline and keep receiving
    /// reward shares.
    pub fn actor_disconnected(&self, actor: &ActorId) {
        if self.config().remove_on_dc {
            match self.leave(actor) {
                Ok(()) | Err(PartyError::NotMember(_)) => {}
                Err(err) => warn!(actor = %actor, error = %err, "Disconnect handling failed"),
            }
        } else if let Some(party_id) = self.find_party_of(actor) {
            if let Some(party) = self.party_ref(&party_id) {
                lock(&party).set_online(actor, false);
            }
        }
    }

    // --- Queries and chat ---

    /// Roster snapshot of the actor's party, for the external front end
    pub fn roster_of(&self, actor: &ActorId) -> Option<PartyRoster> {
        let party_id = self.find_party_of_or_invited(actor)?;
        let party = self.party_ref(&party_id)?;
        let guard = lock(&party);
        Some(guard.roster())
    }

    /// Relay a chat message to the sender's party
    pub fn party_message(&self, sender: &ActorId, text: impl Into<String>) -> PartyResult<()> {
        let party_id = self
            .find_party_of(sender)
            .ok_or_else(|| PartyError::NotMember(sender.clone()))?;
        self.emit(PartyEvent::ChatMessage {
            party_id,
            sender: sender.clone(),
            text: text.into(),
        });
        Ok(())
    }

    /// Flip the actor's party-chat toggle; returns the new state
    pub fn toggle_chat(&self, actor: &ActorId) -> bool {
        let enabled = if self.toggled.remove(actor).is_some() {
            false
        } else {
            self.toggled.insert(actor.clone(), ());
            true
        };
        self.emit(PartyEvent::ChatToggled {
            actor_id: actor.clone(),
            enabled,
        });
        enabled
    }

    /// Whether the actor has party chat toggled on
    pub fn is_chat_toggled(&self, actor: &ActorId) -> bool {
        self.toggled.contains_key(actor)
    }

    /// Number of live parties
    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    /// Drop all parties, index entries, and chat toggles (process shutdown)
    pub fn clear(&self) {
        info!(parties = self.parties.len(), "Clearing party registry");
        self.parties.clear();
        self.index.clear();
        self.toggled.clear();
    }

    // --- Internals ---

    fn party_ref(&self, party_id: &PartyId) -> Option<Arc<Mutex<Party>>> {
        // Clone out of the shard guard; never hold it across a mutex lock
        self.parties.get(party_id).map(|e| e.value().clone())
    }

    fn emit(&self, event: PartyEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn lock(party: &Mutex<Party>) -> MutexGuard<'_, Party> {
    // Party operations keep state consistent on early return, so a
    // poisoned lock still guards a coherent party
    party.lock().unwrap_or_else(PoisonError::into_inner)
}
