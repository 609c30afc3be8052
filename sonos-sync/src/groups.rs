//! Group mutations: join, unjoin, snapshot and restore
//!
//! Every entry point holds the topology lock for the whole multi-speaker
//! operation and, where it changes groups, returns once the waiter saw the
//! result or gave up. Failures of single speakers are logged and skipped.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use sonos_api::{Command, SpeakerId};
use sonos_state::{Convergence, Pending, TopologyGuard};

use crate::dispatch::Dispatcher;
use crate::engine::{EngineInner, SyncEngine};
use crate::snapshot::Snapshot;

/// Result of a group mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Groups the operation waited for, coordinator first
    pub groups: Vec<Vec<SpeakerId>>,
    pub convergence: Convergence,
}

impl GroupOutcome {
    fn unchanged() -> Self {
        Self {
            groups: Vec::new(),
            convergence: Convergence::Converged,
        }
    }
}

/// Same coordinator and the same members in any order
fn same_group(a: &[SpeakerId], b: &[SpeakerId]) -> bool {
    a.first() == b.first()
        && a.iter().collect::<HashSet<_>>() == b.iter().collect::<HashSet<_>>()
}

fn dedup_registered(inner: &EngineInner, devices: &[SpeakerId]) -> Vec<SpeakerId> {
    let mut unique: Vec<SpeakerId> = Vec::with_capacity(devices.len());
    for device in devices {
        if !inner.topology.is_registered(device) {
            debug!("Skipping unregistered speaker {}", device);
        } else if !unique.contains(device) {
            unique.push(device.clone());
        }
    }
    unique
}

impl EngineInner {
    /// Make `speaker` leave its group; requires the topology lock
    async fn unjoin_one(&self, speaker: &SpeakerId) -> bool {
        let outcome = Dispatcher::new(self).send(speaker, Command::Unjoin).await;
        if outcome.is_ok() {
            self.topology.mark_pending(speaker, Pending::Leaving);
        }
        outcome.is_ok()
    }

    /// Add `members` to the group led by `target`; requires the topology lock
    ///
    /// A following `target` leaves its group first. Returns the expected
    /// group, coordinator first.
    async fn join_locked(&self, target: &SpeakerId, members: &[SpeakerId]) -> Vec<SpeakerId> {
        let mut group = if self.topology.effective_coordinator(target).is_some() {
            self.unjoin_one(target).await;
            vec![target.clone()]
        } else {
            // Members already on their way out do not count
            self.topology
                .current_group(target)
                .into_iter()
                .filter(|member| {
                    member == target
                        || self.topology.effective_coordinator(member).as_ref() == Some(target)
                })
                .collect()
        };

        for member in members {
            if member == target || group.contains(member) {
                continue;
            }
            if !self.topology.is_registered(member) {
                debug!("Not joining unregistered speaker {} to {}", member, target);
                continue;
            }

            let command = Command::Join {
                coordinator: target.clone(),
            };
            if Dispatcher::new(self).send(member, command).await.is_ok() {
                self.topology
                    .mark_pending(member, Pending::Joining(target.clone()));
                group.push(member.clone());
            }
        }

        group
    }

    async fn wait_for(
        &self,
        guard: TopologyGuard,
        groups: Vec<Vec<SpeakerId>>,
    ) -> (TopologyGuard, GroupOutcome) {
        let (guard, convergence) = self
            .waiter
            .wait_for(guard, &groups, self.config.convergence_timeout)
            .await;
        (guard, GroupOutcome { groups, convergence })
    }
}

impl SyncEngine {
    /// Group `members` under `coordinator`
    pub async fn join(&self, coordinator: &SpeakerId, members: &[SpeakerId]) -> GroupOutcome {
        let inner = &self.inner;
        let guard = inner.lock.acquire().await;
        if !inner.topology.is_registered(coordinator) {
            debug!("Cannot join to unregistered speaker {}", coordinator);
            return GroupOutcome::unchanged();
        }

        let group = inner.join_locked(coordinator, members).await;
        let (_guard, outcome) = inner.wait_for(guard, vec![group]).await;
        outcome
    }

    /// Make every speaker in `devices` a group of its own
    ///
    /// Followers leave before coordinators so that no follower inherits a
    /// departing coordinator's queue.
    pub async fn unjoin(&self, devices: &[SpeakerId]) -> GroupOutcome {
        let inner = &self.inner;
        let guard = inner.lock.acquire().await;
        let devices = dedup_registered(inner, devices);

        let (coordinators, followers): (Vec<_>, Vec<_>) = devices
            .iter()
            .cloned()
            .partition(|device| inner.topology.is_coordinator(device));

        for device in followers.iter().chain(coordinators.iter()) {
            if inner.topology.current_group(device).len() == 1
                && inner.topology.followers_of(device).is_empty()
            {
                trace!("{} is already alone", device);
                continue;
            }
            inner.unjoin_one(device).await;
        }

        let targets = devices.into_iter().map(|device| vec![device]).collect();
        let (_guard, outcome) = inner.wait_for(guard, targets).await;
        outcome
    }

    /// Capture the state of `devices`, and with `with_group` of everything
    /// grouped with them
    ///
    /// Replaces earlier snapshots of the same speakers. Returns the speakers
    /// that were captured.
    pub async fn snapshot(&self, devices: &[SpeakerId], with_group: bool) -> Vec<SpeakerId> {
        let inner = &self.inner;
        let _guard = inner.lock.acquire().await;

        let mut affected = dedup_registered(inner, devices);
        if with_group {
            let mut index = 0;
            while index < affected.len() {
                for member in inner.topology.current_group(&affected[index]) {
                    if !affected.contains(&member) {
                        affected.push(member);
                    }
                }
                index += 1;
            }
        }

        let mut captured = Vec::with_capacity(affected.len());
        for device in affected {
            match inner.capture(&device, with_group).await {
                Ok(snapshot) => {
                    inner.snapshots.lock().insert(device.clone(), snapshot);
                    captured.push(device);
                }
                Err(e) => warn!("Failed to snapshot {}: {}", device, e),
            }
        }
        debug!("Captured snapshots of {:?}", captured);
        captured
    }

    /// Reapply snapshots of `devices`, and with `with_group` their groups
    ///
    /// Playing coordinators are paused first. Groups are rebuilt and waited
    /// for before any state is restored, followers ahead of coordinators.
    /// Snapshots are consumed whether or not restoring succeeds.
    pub async fn restore(&self, devices: &[SpeakerId], with_group: bool) -> GroupOutcome {
        let inner = &self.inner;
        let guard = inner.lock.acquire().await;

        let snapshots: Vec<Snapshot> = {
            let mut stored = inner.snapshots.lock();
            let mut taken: Vec<Snapshot> = dedup_registered(inner, devices)
                .iter()
                .filter_map(|device| stored.remove(device))
                .collect();
            if with_group {
                let members: Vec<SpeakerId> = taken
                    .iter()
                    .filter_map(|snapshot| snapshot.group.clone())
                    .flatten()
                    .collect();
                for member in members {
                    if let Some(snapshot) = stored.remove(&member) {
                        taken.push(snapshot);
                    }
                }
            }
            taken
        };
        if snapshots.is_empty() {
            debug!("No snapshots to restore for {:?}", devices);
            return GroupOutcome::unchanged();
        }

        // Everyone grouped with a snapshot takes part in regrouping
        let mut participants: Vec<SpeakerId> =
            snapshots.iter().map(|s| s.speaker_id.clone()).collect();
        if with_group {
            for group in snapshots.iter().filter_map(|s| s.group.as_ref()) {
                for member in group {
                    if inner.topology.is_registered(member) && !participants.contains(member) {
                        participants.push(member.clone());
                    }
                }
            }
        }
        let snapshot_group = |speaker: &SpeakerId| {
            snapshots
                .iter()
                .find(|s| &s.speaker_id == speaker)
                .and_then(|s| s.group.as_ref())
        };

        // Phase 1: silence
        let pause = Dispatcher::new(inner).suppress(&inner.config.ignorable_fault_codes);
        for speaker in &participants {
            let playing = inner
                .states
                .get(speaker)
                .is_some_and(|state| state.transport.is_playing());
            if playing && inner.topology.is_coordinator(speaker) {
                pause.send(speaker, Command::Pause).await;
            }
        }

        // Phase 2: regroup
        let mut targets = Vec::new();
        if with_group {
            for speaker in &participants {
                if inner.topology.is_coordinator(speaker) {
                    continue;
                }
                let live = inner.topology.current_group(speaker);
                let differs = snapshot_group(speaker).map_or(true, |group| !same_group(group, &live));
                if differs {
                    inner.unjoin_one(speaker).await;
                }
            }

            for snapshot in &snapshots {
                let Some(group) = snapshot.group.as_ref() else {
                    continue;
                };
                if group.first() != Some(&snapshot.speaker_id) {
                    continue;
                }
                inner.join_locked(&snapshot.speaker_id, &group[1..]).await;
                targets.push(
                    group
                        .iter()
                        .filter(|member| inner.topology.is_registered(member))
                        .cloned()
                        .collect::<Vec<_>>(),
                );
            }
        }

        let (_guard, outcome) = inner.wait_for(guard, targets).await;

        // Phase 3: followers first so they do not disturb restored coordinators
        let (coordinators, followers): (Vec<&Snapshot>, Vec<&Snapshot>) = snapshots
            .iter()
            .partition(|s| inner.topology.is_coordinator(&s.speaker_id));
        for snapshot in followers.into_iter().chain(coordinators) {
            inner.restore_one(snapshot).await;
        }

        outcome
    }
}
