//! Short-lived cache of each device's own group report

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use sonos_api::{GroupView, SpeakerId};

/// Caches `GroupView` polls for a few seconds
///
/// Topology events for every speaker of a household arrive in bursts; each
/// one can fall back to polling the speaker's group, and the answers are the
/// same for the whole burst. Entries expire after `ttl` and are dropped
/// wholesale after every convergence wait.
pub struct GroupViewCache {
    ttl: Duration,
    entries: Mutex<HashMap<SpeakerId, (GroupView, Instant)>>,
}

impl GroupViewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh cached view for `speaker`, if any
    pub fn get(&self, speaker: &SpeakerId) -> Option<GroupView> {
        let mut entries = self.entries.lock();
        match entries.get(speaker) {
            Some((view, stored)) if stored.elapsed() < self.ttl => Some(view.clone()),
            Some(_) => {
                entries.remove(speaker);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, speaker: SpeakerId, view: GroupView) {
        self.entries.lock().insert(speaker, (view, Instant::now()));
    }

    pub fn invalidate(&self, speaker: &SpeakerId) {
        self.entries.lock().remove(speaker);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
