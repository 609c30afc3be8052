//! Availability tracking and the polling fallback
//!
//! A refresh probes every speaker. Speakers that went away lose their
//! subscriptions and recorded state, speakers that came back are
//! re-initialized, and reachable speakers with silent event channels get
//! those channels polled.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, trace, warn};

use sonos_api::{Service, SpeakerId};
use sonos_state::StateChange;

use crate::engine::{EngineInner, SyncEngine};

impl EngineInner {
    /// One refresh cycle for a single speaker
    pub(crate) async fn refresh_device(&self, speaker: &SpeakerId) {
        let Some(state) = self.states.get(speaker) else {
            return;
        };

        let id = speaker.clone();
        let timeout = self.config.probe_timeout;
        let reachable = match self.call(move |proxy| Ok(proxy.probe(&id, timeout))).await {
            Ok(reachable) => reachable,
            Err(e) => {
                debug!("Probe of {} did not run: {}", speaker, e);
                return;
            }
        };

        match (state.available, reachable) {
            (true, false) => self.mark_unavailable(speaker).await,
            (false, true) => {
                info!("Speaker {} is reachable again", speaker);
                if let Err(e) = self.initialize(speaker).await {
                    warn!("Failed to re-initialize {}: {}", speaker, e);
                }
            }
            (true, true) => self.poll_silent_channels(speaker).await,
            (false, false) => trace!("Speaker {} still unreachable", speaker),
        }
    }

    /// Drop subscriptions, recorded state and group membership
    pub(crate) async fn mark_unavailable(&self, speaker: &SpeakerId) {
        warn!("Speaker {} became unreachable", speaker);
        self.unsubscribe_all(speaker).await;

        if let Err(e) = self.states.update(speaker, |state| state.reset_unavailable()) {
            debug!("Could not reset state of {}: {}", speaker, e);
        }

        let _guard = self.lock.acquire().await;
        let affected = self.topology.current_group(speaker);
        self.topology.reset_device(speaker);
        self.group_views.invalidate(speaker);
        self.states
            .emit(StateChange::TopologyChanged { speakers: affected });
    }

    async fn poll_silent_channels(&self, speaker: &SpeakerId) {
        for service in self.silent_channels(speaker) {
            trace!("Polling silent {} channel of {}", service, speaker);
            let result = match service {
                Service::ZoneGroupTopology => self.update_groups(speaker, None).await,
                Service::RenderingControl => self.update_volume(speaker).await,
                Service::AVTransport if self.topology.is_coordinator(speaker) => {
                    self.update_media(speaker, None).await
                }
                Service::AVTransport => Ok(()),
                Service::ContentDirectory => {
                    self.update_favorites(speaker).await;
                    Ok(())
                }
            };
            if let Err(e) = result {
                debug!("Polling {} of {} failed: {}", service, speaker, e);
            }
        }
    }
}

impl SyncEngine {
    /// Run one refresh cycle over every registered speaker
    pub async fn refresh(&self) {
        let speakers = self.devices();
        let inner = &self.inner;
        join_all(speakers.iter().map(|speaker| inner.refresh_device(speaker))).await;
    }

    /// Refresh every `refresh_interval` until [`SyncEngine::shutdown`]
    ///
    /// Replaces a loop started earlier.
    pub fn spawn_refresh_loop(&self) {
        let engine = Arc::downgrade(&self.inner);
        let period = self.inner.config.refresh_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                SyncEngine { inner }.refresh().await;
            }
            trace!("Refresh loop stopped");
        });

        if let Some(previous) = self.inner.refresh_task.lock().replace(task) {
            previous.abort();
        }
    }
}
