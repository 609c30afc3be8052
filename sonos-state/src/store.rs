//! Observable per-device state with change broadcast
//!
//! The StateStore holds the latest [`DeviceState`] of every registered
//! speaker. Writers go through [`StateStore::update`], which publishes a
//! [`StateChange`] when the state actually changed.
//!
//! ```rust,ignore
//! let store = StateStore::new();
//! let mut changes = store.subscribe_changes();
//! tokio::spawn(async move {
//!     while let Ok(change) = changes.recv().await {
//!         println!("{:?}", change);
//!     }
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::error::{Result, StateError};
use crate::model::{DeviceState, SpeakerId};

const CHANGE_CHANNEL_CAPACITY: usize = 1000;

// ============================================================================
// StateChange (for broadcast)
// ============================================================================

/// Emitted whenever observable state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    DeviceAdded { speaker_id: SpeakerId },
    DeviceRemoved { speaker_id: SpeakerId },
    /// State of the speaker, or of the coordinator it mirrors, changed
    DeviceUpdated { speaker_id: SpeakerId },
    /// Group membership of the listed speakers changed
    TopologyChanged { speakers: Vec<SpeakerId> },
}

// ============================================================================
// StateStore
// ============================================================================

#[derive(Clone)]
pub struct StateStore {
    devices: Arc<RwLock<HashMap<SpeakerId, DeviceState>>>,
    changes: broadcast::Sender<StateChange>,
}

impl StateStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    pub fn insert(&self, speaker_id: SpeakerId, state: DeviceState) -> Result<()> {
        {
            let mut devices = self.devices.write();
            if devices.contains_key(&speaker_id) {
                return Err(StateError::AlreadyRegistered(speaker_id));
            }
            devices.insert(speaker_id.clone(), state);
        }
        self.emit(StateChange::DeviceAdded { speaker_id });
        Ok(())
    }

    pub fn remove(&self, speaker_id: &SpeakerId) -> Option<DeviceState> {
        let removed = self.devices.write().remove(speaker_id);
        if removed.is_some() {
            self.emit(StateChange::DeviceRemoved {
                speaker_id: speaker_id.clone(),
            });
        }
        removed
    }

    pub fn get(&self, speaker_id: &SpeakerId) -> Option<DeviceState> {
        self.devices.read().get(speaker_id).cloned()
    }

    pub fn contains(&self, speaker_id: &SpeakerId) -> bool {
        self.devices.read().contains_key(speaker_id)
    }

    pub fn speaker_ids(&self) -> Vec<SpeakerId> {
        let mut ids: Vec<_> = self.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Mutate a speaker's state; emits `DeviceUpdated` if anything changed
    pub fn update<R>(
        &self,
        speaker_id: &SpeakerId,
        f: impl FnOnce(&mut DeviceState) -> R,
    ) -> Result<R> {
        let (result, changed) = {
            let mut devices = self.devices.write();
            let state = devices
                .get_mut(speaker_id)
                .ok_or_else(|| StateError::SpeakerNotFound(speaker_id.clone()))?;
            let before = state.clone();
            let result = f(state);
            (result, *state != before)
        };
        if changed {
            self.touch(speaker_id);
        }
        Ok(result)
    }

    /// Tell observers to re-read a speaker without changing it
    pub fn touch(&self, speaker_id: &SpeakerId) {
        self.emit(StateChange::DeviceUpdated {
            speaker_id: speaker_id.clone(),
        });
    }

    pub fn emit(&self, change: StateChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> SpeakerId {
        SpeakerId::new("RINCON_KITCHEN")
    }

    #[test]
    fn test_insert_twice_fails() {
        let store = StateStore::new();
        store
            .insert(kitchen(), DeviceState::new("Kitchen", "One"))
            .unwrap();
        let err = store
            .insert(kitchen(), DeviceState::new("Kitchen", "One"))
            .unwrap_err();
        assert!(matches!(err, StateError::AlreadyRegistered(_)));
    }

    #[test]
    fn test_update_unknown_speaker() {
        let store = StateStore::new();
        let err = store.update(&kitchen(), |s| s.volume = Some(3)).unwrap_err();
        assert!(matches!(err, StateError::SpeakerNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_emits_only_on_change() {
        let store = StateStore::new();
        let mut rx = store.subscribe_changes();
        store
            .insert(kitchen(), DeviceState::new("Kitchen", "One"))
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            StateChange::DeviceAdded {
                speaker_id: kitchen()
            }
        );

        store.update(&kitchen(), |s| s.volume = Some(20)).unwrap();
        store.update(&kitchen(), |s| s.volume = Some(20)).unwrap();
        store.remove(&kitchen());

        assert_eq!(
            rx.recv().await.unwrap(),
            StateChange::DeviceUpdated {
                speaker_id: kitchen()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StateChange::DeviceRemoved {
                speaker_id: kitchen()
            }
        );
    }
}
