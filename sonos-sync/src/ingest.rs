//! Event ingestion
//!
//! Each registered speaker owns one unbounded queue shared by all of its
//! subscriptions. A single dispatcher task drains it, so the handlers of one
//! speaker never overlap. The handlers double as the poll path of the
//! refresh cycle: passing no event content makes them ask the device.

use std::sync::Weak;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use sonos_api::{Favorite, InputSource, RawEvent, SpeakerId};
use sonos_state::reconciler::is_radio_uri;
use sonos_state::{
    decode_event, DecodedEvent, MediaPoll, RenderingUpdate, StateChange, TopologyUpdate,
    TransportState, TransportUpdate, SOURCE_LINEIN, SOURCE_TV,
};

use crate::engine::EngineInner;
use crate::{Result, SyncError};

/// Drain one speaker's event queue until the engine or the queue goes away
pub(crate) async fn run_dispatcher(
    engine: Weak<EngineInner>,
    mut events: mpsc::UnboundedReceiver<RawEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = engine.upgrade() else {
            break;
        };
        inner.handle_event(event).await;
    }
    trace!("Event dispatcher stopped");
}

impl EngineInner {
    pub(crate) async fn handle_event(&self, event: RawEvent) {
        let speaker = event.speaker_id.clone();
        match self.devices.get_mut(&speaker) {
            Some(mut runtime) => runtime.activity.record(event.service),
            None => {
                debug!(
                    "Dropping {} event from unregistered speaker {}",
                    event.service, speaker
                );
                return;
            }
        }

        let Some(decoded) = decode_event(&event) else {
            return;
        };
        debug!("Received {} event from {}", event.service, speaker);

        let result = match decoded {
            DecodedEvent::Transport(update) => self.update_media(&speaker, Some(&update)).await,
            DecodedEvent::Rendering(update) => self.apply_rendering(&speaker, update),
            DecodedEvent::Topology(update) => self.update_groups(&speaker, Some(update)).await,
            DecodedEvent::Content(update) => {
                if update.favorites_changed {
                    self.update_favorites(&speaker).await;
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!(
                "Failed to process {} event from {}: {}",
                event.service, speaker, e
            );
        }
    }

    // ========================================================================
    // Transport and media
    // ========================================================================

    /// Reconcile transport state and media of a coordinator
    ///
    /// The state carried by `update` wins over the polled one. Transitional
    /// states are dropped before anything is polled.
    pub(crate) async fn update_media(
        &self,
        speaker: &SpeakerId,
        update: Option<&TransportUpdate>,
    ) -> Result<()> {
        let reported = update.and_then(|u| u.state);
        if reported.is_some_and(|state| !state.is_terminal()) {
            trace!("Ignoring transitional transport state of {}", speaker);
            return Ok(());
        }

        let id = speaker.clone();
        let transport = self.call(move |proxy| proxy.transport_info(&id)).await?;
        let Some(status) = reported.or_else(|| TransportState::from_upnp(&transport.state)) else {
            debug!(
                "Unknown transport state {:?} reported by {}",
                transport.state, speaker
            );
            return Ok(());
        };
        if !status.is_terminal() {
            trace!("Ignoring transitional transport state of {}", speaker);
            return Ok(());
        }

        let id = speaker.clone();
        let poll = match self.call(move |proxy| proxy.input_source(&id)).await? {
            InputSource::LineIn => MediaPoll::LineIn(SOURCE_LINEIN.to_string()),
            InputSource::Tv => MediaPoll::LineIn(SOURCE_TV.to_string()),
            InputSource::Media => {
                let id = speaker.clone();
                let track = self.call(move |proxy| proxy.track_info(&id)).await?;
                let uri = update
                    .and_then(|u| u.track_uri.clone())
                    .unwrap_or_else(|| track.uri.clone());
                if is_radio_uri(&uri) {
                    let id = speaker.clone();
                    let media = self.call(move |proxy| proxy.media_info(&id)).await?;
                    MediaPoll::Radio {
                        track,
                        media,
                        radio_show: update.and_then(|u| u.radio_show.clone()),
                    }
                } else {
                    MediaPoll::Track(track)
                }
            }
        };

        let reconciler = self.reconciler;
        let shuffle = transport.shuffle;
        let recorded = self.states.update(speaker, |state| {
            reconciler.reconcile(state, status, shuffle, poll, Utc::now())
        })?;

        // Followers show the coordinator's playback
        if recorded {
            for follower in self.topology.followers_of(speaker) {
                self.states.touch(&follower);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub(crate) fn apply_rendering(&self, speaker: &SpeakerId, update: RenderingUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.states.update(speaker, |state| {
            if let Some(volume) = update.volume {
                state.volume = Some(volume);
            }
            if let Some(mute) = update.mute {
                state.muted = Some(mute);
            }
            if let Some(night) = update.night_mode {
                state.night_sound = Some(night);
            }
            if let Some(dialog) = update.dialog_mode {
                state.speech_enhance = Some(dialog);
            }
        })?;
        Ok(())
    }

    /// Poll volume, mute and the home theater flags
    pub(crate) async fn update_volume(&self, speaker: &SpeakerId) -> Result<()> {
        let id = speaker.clone();
        let info = self.call(move |proxy| proxy.rendering_info(&id)).await?;
        self.states.update(speaker, |state| {
            state.volume = Some(info.volume.min(100));
            state.muted = Some(info.mute);
            state.night_sound = info.night_mode;
            state.speech_enhance = info.dialog_mode;
        })?;
        Ok(())
    }

    // ========================================================================
    // Topology
    // ========================================================================

    /// Apply a topology notification, or poll the group view if `update`
    /// carries no member list
    pub(crate) async fn update_groups(
        &self,
        speaker: &SpeakerId,
        update: Option<TopologyUpdate>,
    ) -> Result<()> {
        if update == Some(TopologyUpdate::NoGroupAttribute) {
            trace!("Topology event from {} without group attribute", speaker);
            return Ok(());
        }
        if !self.topology.is_registered(speaker) {
            return Err(SyncError::SpeakerNotFound(speaker.clone()));
        }

        let _guard = self.lock.acquire().await;
        let group = match update {
            Some(TopologyUpdate::Members(members)) if !members.is_empty() => members,
            _ => self.resolve_group_view(speaker).await,
        };

        // Only a coordinator speaks for its group
        if group.first() != Some(speaker) {
            trace!("{} does not lead {:?}, not applying", speaker, group);
            return Ok(());
        }

        let applied = self.topology.set_group(&group);
        if !applied.is_empty() {
            self.states
                .emit(StateChange::TopologyChanged { speakers: applied });
        }
        Ok(())
    }

    /// The speaker's own group view, coordinator first
    ///
    /// Served from the cache while fresh. A failed poll yields a group of one.
    pub(crate) async fn resolve_group_view(&self, speaker: &SpeakerId) -> Vec<SpeakerId> {
        if let Some(view) = self.group_views.get(speaker) {
            return view.ordered();
        }

        let id = speaker.clone();
        match self.call(move |proxy| proxy.group_view(&id)).await {
            Ok(view) => {
                let ordered = view.ordered();
                self.group_views.insert(speaker.clone(), view);
                ordered
            }
            Err(e) => {
                debug!("Could not read group view of {}: {}", speaker, e);
                vec![speaker.clone()]
            }
        }
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Re-read favorites; malformed entries are hidden
    pub(crate) async fn update_favorites(&self, speaker: &SpeakerId) {
        let id = speaker.clone();
        let favorites = match self.call(move |proxy| proxy.favorites(&id)).await {
            Ok(favorites) => favorites,
            Err(e) => {
                debug!("Could not read favorites from {}: {}", speaker, e);
                Vec::new()
            }
        };

        let (valid, malformed): (Vec<Favorite>, Vec<Favorite>) =
            favorites.into_iter().partition(Favorite::is_valid);
        for favorite in &malformed {
            debug!(
                "Hiding malformed favorite {:?} on {}",
                favorite.title, speaker
            );
        }

        if let Err(e) = self.states.update(speaker, |state| state.favorites = valid) {
            debug!("Could not store favorites of {}: {}", speaker, e);
        }
    }
}
