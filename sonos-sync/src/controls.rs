//! Playback and administrative commands
//!
//! Playback commands act on the group and are routed to the coordinator;
//! rendering commands act on the addressed speaker alone. Routing and fault
//! handling come from [`Dispatcher::for_command`].

use std::time::Duration;

use tracing::{debug, warn};

use sonos_api::{AlarmUpdate, Command, SpeakerId};
use sonos_state::reconciler::is_radio_uri;
use sonos_state::{SOURCE_LINEIN, SOURCE_TV};

use crate::dispatch::{CommandOutcome, Dispatcher};
use crate::engine::SyncEngine;
use crate::SyncError;

impl SyncEngine {
    async fn dispatch(&self, speaker: &SpeakerId, command: Command) -> CommandOutcome {
        if !self.inner.states.contains(speaker) {
            return CommandOutcome::Failed(SyncError::SpeakerNotFound(speaker.clone()));
        }
        Dispatcher::for_command(&self.inner, &command)
            .send(speaker, command)
            .await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub async fn play(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::Play).await
    }

    pub async fn pause(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::Pause).await
    }

    pub async fn stop(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::Stop).await
    }

    pub async fn next_track(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::Next).await
    }

    pub async fn previous_track(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::Previous).await
    }

    /// Seek within the current track, to whole seconds
    pub async fn seek(&self, speaker: &SpeakerId, position: Duration) -> CommandOutcome {
        let position = Duration::from_secs(position.as_secs());
        self.dispatch(speaker, Command::Seek(position)).await
    }

    pub async fn set_shuffle(&self, speaker: &SpeakerId, shuffle: bool) -> CommandOutcome {
        self.dispatch(speaker, Command::SetShuffle(shuffle)).await
    }

    pub async fn clear_playlist(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::ClearQueue).await
    }

    /// Play `uri` now, or append it to the queue with `enqueue`
    pub async fn play_media(&self, speaker: &SpeakerId, uri: &str, enqueue: bool) -> CommandOutcome {
        let command = if enqueue {
            Command::AddUriToQueue {
                uri: uri.to_string(),
                metadata: None,
            }
        } else {
            Command::PlayUri {
                uri: uri.to_string(),
                title: None,
            }
        };
        self.dispatch(speaker, command).await
    }

    /// Switch to a hardware input or play a favorite by title
    pub async fn select_source(&self, speaker: &SpeakerId, source: &str) -> CommandOutcome {
        if source == SOURCE_LINEIN {
            return self.dispatch(speaker, Command::SwitchToLineIn).await;
        }
        if source == SOURCE_TV {
            return self.dispatch(speaker, Command::SwitchToTv).await;
        }

        let favorite = self
            .device_state(speaker)
            .and_then(|state| state.favorite_by_title(source).cloned());
        let Some((uri, metadata)) =
            favorite.and_then(|fav| fav.uri.map(|uri| (uri, fav.metadata)))
        else {
            warn!("Unknown source {:?} for {}", source, speaker);
            return CommandOutcome::Failed(SyncError::UnknownSource(source.to_string()));
        };

        if is_radio_uri(&uri) {
            return self
                .dispatch(
                    speaker,
                    Command::PlayUri {
                        uri,
                        title: Some(source.to_string()),
                    },
                )
                .await;
        }

        let cleared = self.dispatch(speaker, Command::ClearQueue).await;
        if !cleared.is_ok() {
            return cleared;
        }
        let queued = self
            .dispatch(speaker, Command::AddUriToQueue { uri, metadata })
            .await;
        if !queued.is_ok() {
            return queued;
        }
        self.dispatch(speaker, Command::PlayFromQueue(0)).await
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub async fn set_volume(&self, speaker: &SpeakerId, volume: u8) -> CommandOutcome {
        self.dispatch(speaker, Command::SetVolume(volume.min(100))).await
    }

    pub async fn volume_up(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.step_volume(speaker, i16::from(self.inner.config.volume_step))
            .await
    }

    pub async fn volume_down(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.step_volume(speaker, -i16::from(self.inner.config.volume_step))
            .await
    }

    async fn step_volume(&self, speaker: &SpeakerId, delta: i16) -> CommandOutcome {
        let recorded = self.device_state(speaker).and_then(|state| state.volume);
        let current = match recorded {
            Some(volume) => volume,
            None => {
                if let Err(e) = self.inner.update_volume(speaker).await {
                    debug!("Could not read volume of {}: {}", speaker, e);
                    return CommandOutcome::Failed(e);
                }
                self.device_state(speaker)
                    .and_then(|state| state.volume)
                    .unwrap_or_default()
            }
        };
        let target = (i16::from(current) + delta).clamp(0, 100) as u8;
        self.set_volume(speaker, target).await
    }

    pub async fn set_mute(&self, speaker: &SpeakerId, mute: bool) -> CommandOutcome {
        self.dispatch(speaker, Command::SetMute(mute)).await
    }

    /// Change home theater options the speaker supports; others are skipped
    pub async fn set_option(
        &self,
        speaker: &SpeakerId,
        night_sound: Option<bool>,
        speech_enhance: Option<bool>,
    ) -> CommandOutcome {
        let Some(state) = self.device_state(speaker) else {
            return CommandOutcome::Failed(SyncError::SpeakerNotFound(speaker.clone()));
        };

        let mut outcome = CommandOutcome::Sent;
        if let Some(night) = night_sound.filter(|_| state.night_sound.is_some()) {
            outcome = outcome.and(self.dispatch(speaker, Command::SetNightMode(night)).await);
        }
        if let Some(speech) = speech_enhance.filter(|_| state.speech_enhance.is_some()) {
            outcome = outcome.and(self.dispatch(speaker, Command::SetDialogMode(speech)).await);
        }
        outcome
    }

    // ========================================================================
    // Timers and alarms
    // ========================================================================

    pub async fn set_sleep_timer(&self, speaker: &SpeakerId, duration: Duration) -> CommandOutcome {
        self.dispatch(speaker, Command::SetSleepTimer(Some(duration)))
            .await
    }

    pub async fn clear_sleep_timer(&self, speaker: &SpeakerId) -> CommandOutcome {
        self.dispatch(speaker, Command::SetSleepTimer(None)).await
    }

    /// Change an existing alarm; an unknown alarm id is reported as a warning
    pub async fn update_alarm(&self, speaker: &SpeakerId, alarm: AlarmUpdate) -> CommandOutcome {
        self.dispatch(speaker, Command::UpdateAlarm(alarm)).await
    }
}
