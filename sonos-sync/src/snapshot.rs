//! Capturing and reapplying one speaker's playback state

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sonos_api::{Command, SpeakerId};
use sonos_state::reconciler::parse_timespan;
use sonos_state::TransportState;

use crate::dispatch::{CommandOutcome, Dispatcher};
use crate::engine::EngineInner;
use crate::Result;

const QUEUE_URI_SCHEME: &str = "x-rincon-queue:";

/// What a coordinator was playing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub uri: String,
    pub metadata: Option<String>,
    /// 1-based queue entry, when playing from the queue
    pub queue_position: Option<u32>,
    pub position: Option<Duration>,
}

impl MediaSnapshot {
    pub fn is_queue(&self) -> bool {
        self.uri.starts_with(QUEUE_URI_SCHEME)
    }
}

/// Captured state of one speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub speaker_id: SpeakerId,
    pub is_coordinator: bool,
    pub transport: TransportState,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    /// Coordinators only
    pub media: Option<MediaSnapshot>,
    /// Group at capture time, coordinator first; `None` unless requested
    pub group: Option<Vec<SpeakerId>>,
}

impl EngineInner {
    pub(crate) async fn capture(&self, speaker: &SpeakerId, with_group: bool) -> Result<Snapshot> {
        let recorded = self.require(speaker)?;
        let is_coordinator = self.topology.is_coordinator(speaker);

        let id = speaker.clone();
        let (volume, muted) = match self.call(move |proxy| proxy.rendering_info(&id)).await {
            Ok(info) => (Some(info.volume), Some(info.mute)),
            Err(e) => {
                debug!("Using recorded volume of {}: {}", speaker, e);
                (recorded.volume, recorded.muted)
            }
        };

        let mut transport = recorded.transport;
        let mut media = None;
        if is_coordinator {
            let id = speaker.clone();
            if let Ok(info) = self.call(move |proxy| proxy.transport_info(&id)).await {
                transport = TransportState::from_upnp(&info.state)
                    .filter(TransportState::is_terminal)
                    .unwrap_or(transport);
            }

            let id = speaker.clone();
            let current = self.call(move |proxy| proxy.media_info(&id)).await?;
            let id = speaker.clone();
            let track = self.call(move |proxy| proxy.track_info(&id)).await?;
            media = Some(MediaSnapshot {
                uri: current.current_uri,
                metadata: current.current_uri_metadata,
                queue_position: track.queue_position,
                position: parse_timespan(track.position.as_deref()),
            });
        }

        Ok(Snapshot {
            speaker_id: speaker.clone(),
            is_coordinator,
            transport,
            volume,
            muted,
            media,
            group: with_group.then(|| self.topology.current_group(speaker)),
        })
    }

    /// Reapply a snapshot to its speaker
    ///
    /// Commands go to the speaker itself, never to its coordinator. Every
    /// step is attempted even if an earlier one failed.
    pub(crate) async fn restore_one(&self, snapshot: &Snapshot) -> CommandOutcome {
        let speaker = &snapshot.speaker_id;
        let dispatcher = Dispatcher::new(self).suppress(&self.config.ignorable_fault_codes);
        let mut outcome = CommandOutcome::Sent;

        if let Some(volume) = snapshot.volume {
            outcome = outcome.and(dispatcher.send(speaker, Command::SetVolume(volume)).await);
        }
        if let Some(muted) = snapshot.muted {
            outcome = outcome.and(dispatcher.send(speaker, Command::SetMute(muted)).await);
        }

        if snapshot.is_coordinator {
            outcome = outcome.and(self.restore_playback(&dispatcher, snapshot).await);
        }

        if let Some(err) = outcome.error() {
            warn!("Failed to restore {}: {}", speaker, err);
        }
        outcome
    }

    async fn restore_playback(
        &self,
        dispatcher: &Dispatcher<'_>,
        snapshot: &Snapshot,
    ) -> CommandOutcome {
        let speaker = &snapshot.speaker_id;
        let mut outcome = CommandOutcome::Sent;

        if let Some(media) = &snapshot.media {
            if media.is_queue() {
                outcome = outcome.and(
                    dispatcher
                        .send(
                            speaker,
                            Command::SetTransportUri {
                                uri: media.uri.clone(),
                                metadata: None,
                            },
                        )
                        .await,
                );
                if let Some(track) = media.queue_position.filter(|p| *p > 0) {
                    outcome = outcome.and(dispatcher.send(speaker, Command::SeekTrack(track)).await);
                }
                if let Some(position) = media.position {
                    outcome = outcome.and(dispatcher.send(speaker, Command::Seek(position)).await);
                }
            } else if !media.uri.is_empty() {
                outcome = outcome.and(
                    dispatcher
                        .send(
                            speaker,
                            Command::SetTransportUri {
                                uri: media.uri.clone(),
                                metadata: media.metadata.clone(),
                            },
                        )
                        .await,
                );
            }
        }

        let transport = match snapshot.transport {
            TransportState::Playing => Some(Command::Play),
            TransportState::Paused => Some(Command::Pause),
            TransportState::Stopped | TransportState::Idle => Some(Command::Stop),
            TransportState::Transitioning | TransportState::Off => None,
        };
        if let Some(command) = transport {
            outcome = outcome.and(dispatcher.send(speaker, command).await);
        }
        outcome
    }
}
