//! Group membership store
//!
//! Each registered speaker is in exactly one [`Membership`] state. All
//! transitions go through [`TopologyStore::set_group`] and
//! [`TopologyStore::reset_device`], which keep the cross-device invariant:
//!
//! - a `Follower { coordinator: C }` has `C` registered as `Coordinator`
//!   with itself in `C`'s member list;
//! - a `Coordinator { members }` lists itself first, and every other member
//!   is a follower of it;
//! - an `Unknown` speaker appears in no member list.
//!
//! Every write bumps a version published on a `watch` channel, which is
//! what [`ConvergenceWaiter`](crate::convergence::ConvergenceWaiter) parks on.
//!
//! Besides the authoritative membership, a speaker can carry a [`Pending`]
//! overlay: the engine's record of a join or unjoin it sent that no
//! coordinator has confirmed yet. Ordering decisions read the overlay
//! ([`TopologyStore::effective_coordinator`]); convergence only looks at the
//! authoritative state.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::{Result, StateError};
use crate::model::SpeakerId;

/// Authoritative group membership of one speaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// No group information yet, or the speaker's group was dissolved
    Unknown,
    Follower {
        coordinator: SpeakerId,
    },
    /// Leads a group; `members` starts with the coordinator itself
    Coordinator {
        members: Vec<SpeakerId>,
    },
}

/// Unconfirmed local change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Joining(SpeakerId),
    Leaving,
}

#[derive(Debug, Clone)]
struct Entry {
    membership: Membership,
    pending: Option<Pending>,
}

impl Entry {
    fn unknown() -> Self {
        Self {
            membership: Membership::Unknown,
            pending: None,
        }
    }
}

/// Per-speaker membership with change notification
pub struct TopologyStore {
    entries: RwLock<HashMap<SpeakerId, Entry>>,
    version: watch::Sender<u64>,
}

impl TopologyStore {
    pub fn new() -> Self {
        let (version, _rx) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            version,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add a speaker in the `Unknown` state; no-op if already present
    pub fn register(&self, speaker: &SpeakerId) {
        let mut entries = self.entries.write();
        if !entries.contains_key(speaker) {
            entries.insert(speaker.clone(), Entry::unknown());
            drop(entries);
            self.bump();
        }
    }

    /// Remove a speaker, detaching it from its group first
    pub fn unregister(&self, speaker: &SpeakerId) {
        let mut entries = self.entries.write();
        if !entries.contains_key(speaker) {
            return;
        }
        detach(&mut entries, speaker);
        entries.remove(speaker);
        drop(entries);
        self.bump();
    }

    pub fn is_registered(&self, speaker: &SpeakerId) -> bool {
        self.entries.read().contains_key(speaker)
    }

    pub fn speakers(&self) -> Vec<SpeakerId> {
        let mut ids: Vec<_> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn membership(&self, speaker: &SpeakerId) -> Option<Membership> {
        self.entries
            .read()
            .get(speaker)
            .map(|entry| entry.membership.clone())
    }

    pub fn pending(&self, speaker: &SpeakerId) -> Option<Pending> {
        self.entries
            .read()
            .get(speaker)
            .and_then(|entry| entry.pending.clone())
    }

    /// Authoritative coordinator, `None` if the speaker leads itself
    pub fn coordinator(&self, speaker: &SpeakerId) -> Option<SpeakerId> {
        match self.membership(speaker)? {
            Membership::Follower { coordinator } => Some(coordinator),
            _ => None,
        }
    }

    /// Coordinator including unconfirmed local joins and unjoins
    pub fn effective_coordinator(&self, speaker: &SpeakerId) -> Option<SpeakerId> {
        let entries = self.entries.read();
        let entry = entries.get(speaker)?;
        match &entry.pending {
            Some(Pending::Joining(coordinator)) => Some(coordinator.clone()),
            Some(Pending::Leaving) => None,
            None => match &entry.membership {
                Membership::Follower { coordinator } => Some(coordinator.clone()),
                _ => None,
            },
        }
    }

    pub fn is_coordinator(&self, speaker: &SpeakerId) -> bool {
        self.effective_coordinator(speaker).is_none()
    }

    /// Ordered group of `speaker`, coordinator first
    ///
    /// An `Unknown` or unregistered speaker is a group of one.
    pub fn current_group(&self, speaker: &SpeakerId) -> Vec<SpeakerId> {
        let entries = self.entries.read();
        group_of(&entries, speaker)
    }

    /// Speakers whose effective coordinator is `coordinator`
    pub fn followers_of(&self, coordinator: &SpeakerId) -> Vec<SpeakerId> {
        let mut followers: Vec<_> = self
            .speakers()
            .into_iter()
            .filter(|id| self.effective_coordinator(id).as_ref() == Some(coordinator))
            .collect();
        followers.sort();
        followers
    }

    /// Whether the live group led by `target[0]` has exactly `target[1..]`
    /// as followers, in any order
    pub fn matches(&self, target: &[SpeakerId]) -> bool {
        let Some(head) = target.first() else {
            return true;
        };
        let current = self.current_group(head);
        if current.first() != Some(head) {
            return false;
        }
        let want: HashSet<_> = target[1..].iter().collect();
        let have: HashSet<_> = current[1..].iter().collect();
        want == have
    }

    /// Distinct groups, each coordinator first, sorted by coordinator
    pub fn groups(&self) -> Vec<Vec<SpeakerId>> {
        let entries = self.entries.read();
        let mut groups: Vec<Vec<SpeakerId>> = entries
            .iter()
            .filter_map(|(id, entry)| match &entry.membership {
                Membership::Follower { .. } => None,
                _ => Some(group_of(&entries, id)),
            })
            .collect();
        groups.sort();
        groups
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Apply a coordinator-resolved group
    ///
    /// Unregistered ids and duplicates are dropped. Followers of a member
    /// that are not in the new list become `Unknown`; members taken from
    /// another coordinator are removed from its list. Returns the group as
    /// applied (empty if nothing was applied).
    pub fn set_group(&self, group: &[SpeakerId]) -> Vec<SpeakerId> {
        let mut entries = self.entries.write();

        let mut members: Vec<SpeakerId> = Vec::with_capacity(group.len());
        for id in group {
            if entries.contains_key(id) && !members.contains(id) {
                members.push(id.clone());
            } else if !entries.contains_key(id) {
                trace!("Ignoring unregistered speaker {} in group", id);
            }
        }
        let Some(head) = members.first().cloned() else {
            return members;
        };

        let mut orphans = Vec::new();
        let mut departures = Vec::new();
        for id in &members {
            match entries.get(id).map(|entry| &entry.membership) {
                Some(Membership::Coordinator { members: old }) => {
                    orphans.extend(
                        old.iter()
                            .filter(|m| *m != id && !members.contains(m))
                            .cloned(),
                    );
                }
                Some(Membership::Follower { coordinator }) if !members.contains(coordinator) => {
                    departures.push((id.clone(), coordinator.clone()));
                }
                _ => {}
            }
        }

        for orphan in &orphans {
            if let Some(entry) = entries.get_mut(orphan) {
                debug!("Speaker {} left its group, membership unknown", orphan);
                entry.membership = Membership::Unknown;
                entry.pending = None;
            }
        }
        for (id, coordinator) in &departures {
            if let Some(Entry {
                membership: Membership::Coordinator { members: old },
                ..
            }) = entries.get_mut(coordinator)
            {
                old.retain(|m| m != id);
            }
        }

        for id in &members {
            let membership = if *id == head {
                Membership::Coordinator {
                    members: members.clone(),
                }
            } else {
                Membership::Follower {
                    coordinator: head.clone(),
                }
            };
            if let Some(entry) = entries.get_mut(id) {
                entry.membership = membership;
                entry.pending = None;
            }
        }
        drop(entries);

        debug!("Applied group {:?}", members);
        self.bump();
        members
    }

    /// Drop a speaker out of any group, leaving it `Unknown`
    pub fn reset_device(&self, speaker: &SpeakerId) {
        let mut entries = self.entries.write();
        if !entries.contains_key(speaker) {
            return;
        }
        detach(&mut entries, speaker);
        drop(entries);
        self.bump();
    }

    /// Record an unconfirmed local change; does not notify waiters
    pub fn mark_pending(&self, speaker: &SpeakerId, pending: Pending) {
        if let Some(entry) = self.entries.write().get_mut(speaker) {
            entry.pending = Some(pending);
        }
    }

    pub fn clear_pending(&self, speaker: &SpeakerId) {
        if let Some(entry) = self.entries.write().get_mut(speaker) {
            entry.pending = None;
        }
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Receiver that changes on every topology write
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Verify the cross-device membership invariant
    pub fn check_invariant(&self) -> Result<()> {
        let entries = self.entries.read();
        let mut listed: HashMap<&SpeakerId, &SpeakerId> = HashMap::new();

        for (id, entry) in entries.iter() {
            match &entry.membership {
                Membership::Unknown => {}
                Membership::Follower { coordinator } => {
                    let leads = match entries.get(coordinator).map(|e| &e.membership) {
                        Some(Membership::Coordinator { members }) => members.contains(id),
                        _ => false,
                    };
                    if !leads {
                        return Err(StateError::InvariantViolation(format!(
                            "{} follows {} which does not list it",
                            id, coordinator
                        )));
                    }
                }
                Membership::Coordinator { members } => {
                    if members.first() != Some(id) {
                        return Err(StateError::InvariantViolation(format!(
                            "{} leads a group it does not head",
                            id
                        )));
                    }
                    for member in members {
                        if let Some(other) = listed.insert(member, id) {
                            return Err(StateError::InvariantViolation(format!(
                                "{} listed by both {} and {}",
                                member, other, id
                            )));
                        }
                        if member == id {
                            continue;
                        }
                        let follows = matches!(
                            entries.get(member).map(|e| &e.membership),
                            Some(Membership::Follower { coordinator }) if coordinator == id
                        );
                        if !follows {
                            return Err(StateError::InvariantViolation(format!(
                                "{} lists {} which does not follow it",
                                id, member
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn group_of(entries: &HashMap<SpeakerId, Entry>, speaker: &SpeakerId) -> Vec<SpeakerId> {
    match entries.get(speaker).map(|entry| &entry.membership) {
        Some(Membership::Coordinator { members }) => members.clone(),
        Some(Membership::Follower { coordinator }) => match entries
            .get(coordinator)
            .map(|entry| &entry.membership)
        {
            Some(Membership::Coordinator { members }) => members.clone(),
            _ => vec![speaker.clone()],
        },
        _ => vec![speaker.clone()],
    }
}

fn detach(entries: &mut HashMap<SpeakerId, Entry>, speaker: &SpeakerId) {
    let membership = match entries.get(speaker) {
        Some(entry) => entry.membership.clone(),
        None => return,
    };
    match membership {
        Membership::Follower { coordinator } => {
            if let Some(Entry {
                membership: Membership::Coordinator { members },
                ..
            }) = entries.get_mut(&coordinator)
            {
                members.retain(|m| m != speaker);
            }
        }
        Membership::Coordinator { members } => {
            for member in members.iter().filter(|m| *m != speaker) {
                if let Some(entry) = entries.get_mut(member) {
                    entry.membership = Membership::Unknown;
                }
            }
        }
        Membership::Unknown => {}
    }
    if let Some(entry) = entries.get_mut(speaker) {
        entry.membership = Membership::Unknown;
        entry.pending = None;
    }
}
