//! In-memory household for engine integration tests
//!
//! `FakeHousehold` plays the part of a set of real players: it answers
//! polls, applies commands and pushes the events a player would send after
//! each change. Every player reports its own group to its own topology
//! subscription, coordinator first, just as real players do.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use sonos_api::{
    ApiError, Command, ContentEvent, DeviceProxy, EventData, EventSink, EventSubscription,
    Favorite, GroupView, InputSource, MediaInfo, RawEvent, RenderingEvent, RenderingInfo, Result,
    Service, SpeakerId, SpeakerInfo, TopologyEvent, TrackInfo, TransportEvent, TransportInfo,
};
use sonos_sync::{EngineConfig, SyncEngine};

pub const LIVING_ROOM: &str = "RINCON_000E58A0000101400";
pub const KITCHEN: &str = "RINCON_000E58A0000201400";
pub const OFFICE: &str = "RINCON_000E58A0000301400";

pub fn id(raw: &str) -> SpeakerId {
    SpeakerId::new(raw)
}

/// One simulated player
#[derive(Debug, Clone)]
pub struct Player {
    pub info: SpeakerInfo,
    /// `None` while the player leads its own group
    pub coordinator: Option<SpeakerId>,
    pub transport: String,
    pub shuffle: bool,
    pub track: TrackInfo,
    pub media: MediaInfo,
    pub rendering: RenderingInfo,
    pub input: InputSource,
    pub queue: Vec<String>,
    pub sleep_timer: Option<Duration>,
    pub reachable: bool,
}

impl Player {
    pub fn new(name: &str, model: &str) -> Self {
        let uri = format!("x-file-cifs://nas/music/{}.mp3", name.to_lowercase());
        Self {
            info: SpeakerInfo {
                zone_name: name.to_string(),
                model_name: model.to_string(),
            },
            coordinator: None,
            transport: "STOPPED".to_string(),
            shuffle: false,
            track: TrackInfo {
                uri: uri.clone(),
                title: Some(format!("{} Song", name)),
                artist: Some("Test Artist".to_string()),
                album: Some("Test Album".to_string()),
                album_art: None,
                duration: Some("0:03:30".to_string()),
                position: Some("0:00:10".to_string()),
                queue_position: None,
            },
            media: MediaInfo {
                current_uri: uri,
                current_uri_metadata: None,
            },
            rendering: RenderingInfo {
                volume: 20,
                mute: false,
                night_mode: None,
                dialog_mode: None,
            },
            input: InputSource::Media,
            queue: Vec::new(),
            sleep_timer: None,
            reachable: true,
        }
    }
}

#[derive(Default)]
struct Household {
    players: BTreeMap<SpeakerId, Player>,
    sinks: HashMap<(SpeakerId, Service), EventSink>,
    favorites: Vec<Favorite>,
    alarms: Vec<String>,
    commands: Vec<(SpeakerId, Command)>,
    failures: HashMap<(SpeakerId, &'static str), ApiError>,
    block_events: bool,
}

impl Household {
    fn player(&self, speaker: &SpeakerId) -> Result<&Player> {
        match self.players.get(speaker) {
            Some(player) if player.reachable => Ok(player),
            Some(_) => Err(ApiError::Unreachable(speaker.to_string())),
            None => Err(ApiError::NotFound(speaker.to_string())),
        }
    }

    fn player_mut(&mut self, speaker: &SpeakerId) -> Result<&mut Player> {
        match self.players.get_mut(speaker) {
            Some(player) if player.reachable => Ok(player),
            Some(_) => Err(ApiError::Unreachable(speaker.to_string())),
            None => Err(ApiError::NotFound(speaker.to_string())),
        }
    }

    fn coordinator_of(&self, speaker: &SpeakerId) -> SpeakerId {
        self.players
            .get(speaker)
            .and_then(|player| player.coordinator.clone())
            .unwrap_or_else(|| speaker.clone())
    }

    /// Coordinator first, then followers in id order
    fn group_of(&self, speaker: &SpeakerId) -> Vec<SpeakerId> {
        let coordinator = self.coordinator_of(speaker);
        let mut group = vec![coordinator.clone()];
        group.extend(
            self.players
                .iter()
                .filter(|(_, player)| player.coordinator.as_ref() == Some(&coordinator))
                .map(|(id, _)| id.clone()),
        );
        group
    }

    fn emit(&self, speaker: &SpeakerId, data: EventData) {
        if self.block_events {
            return;
        }
        if let Some(sink) = self.sinks.get(&(speaker.clone(), data.service())) {
            let _ = sink.send(RawEvent::new(speaker.clone(), data));
        }
    }

    fn topology_event(&self, speaker: &SpeakerId) -> EventData {
        let csv = self
            .group_of(speaker)
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        EventData::ZoneGroupTopology(TopologyEvent {
            zone_player_uuids_in_group: Some(csv),
        })
    }

    fn transport_event(&self, speaker: &SpeakerId) -> Option<EventData> {
        let player = self.players.get(speaker)?;
        Some(EventData::AVTransport(TransportEvent {
            transport_state: Some(player.transport.clone()),
            current_track_uri: Some(player.track.uri.clone()),
            ..Default::default()
        }))
    }

    fn rendering_event(&self, speaker: &SpeakerId) -> Option<EventData> {
        let player = self.players.get(speaker)?;
        Some(EventData::RenderingControl(RenderingEvent {
            volume: Some(player.rendering.volume.to_string()),
            mute: Some(if player.rendering.mute { "1" } else { "0" }.to_string()),
            ..Default::default()
        }))
    }

    /// Every reachable player reports its group
    fn broadcast_topology(&self) {
        for (id, player) in &self.players {
            if player.reachable {
                self.emit(id, self.topology_event(id));
            }
        }
    }

    fn broadcast_transport(&self, speaker: &SpeakerId) {
        if let Some(event) = self.transport_event(speaker) {
            self.emit(speaker, event);
        }
    }

    fn broadcast_rendering(&self, speaker: &SpeakerId) {
        if let Some(event) = self.rendering_event(speaker) {
            self.emit(speaker, event);
        }
    }

    fn leave_group(&mut self, speaker: &SpeakerId) {
        // Remaining members stay together under the next member
        let followers: Vec<SpeakerId> = self
            .players
            .iter()
            .filter(|(_, player)| player.coordinator.as_ref() == Some(speaker))
            .map(|(id, _)| id.clone())
            .collect();
        if let Some((heir, rest)) = followers.split_first() {
            if let Some(player) = self.players.get_mut(heir) {
                player.coordinator = None;
            }
            for follower in rest {
                if let Some(player) = self.players.get_mut(follower) {
                    player.coordinator = Some(heir.clone());
                }
            }
        }
        if let Some(player) = self.players.get_mut(speaker) {
            player.coordinator = None;
        }
    }

    fn apply(&mut self, speaker: &SpeakerId, command: &Command) -> Result<()> {
        self.player(speaker)?;
        match command {
            Command::Play => {
                self.player_mut(speaker)?.transport = "PLAYING".to_string();
                self.broadcast_transport(speaker);
            }
            Command::Pause => {
                let player = self.player_mut(speaker)?;
                if player.transport == "STOPPED" {
                    return Err(ApiError::SoapFault(701));
                }
                player.transport = "PAUSED_PLAYBACK".to_string();
                self.broadcast_transport(speaker);
            }
            Command::Stop => {
                self.player_mut(speaker)?.transport = "STOPPED".to_string();
                self.broadcast_transport(speaker);
            }
            Command::Next | Command::Previous => {
                self.player_mut(speaker)?.track.position = Some("0:00:00".to_string());
            }
            Command::Seek(position) => {
                let secs = position.as_secs();
                self.player_mut(speaker)?.track.position = Some(format!(
                    "{}:{:02}:{:02}",
                    secs / 3600,
                    (secs / 60) % 60,
                    secs % 60
                ));
            }
            Command::SeekTrack(track) => {
                self.player_mut(speaker)?.track.queue_position = Some(*track);
            }
            Command::SetShuffle(shuffle) => self.player_mut(speaker)?.shuffle = *shuffle,
            Command::SetVolume(volume) => {
                self.player_mut(speaker)?.rendering.volume = *volume;
                self.broadcast_rendering(speaker);
            }
            Command::SetMute(mute) => {
                self.player_mut(speaker)?.rendering.mute = *mute;
                self.broadcast_rendering(speaker);
            }
            Command::Join { coordinator } => {
                self.player(coordinator)?;
                self.leave_group(speaker);
                self.player_mut(speaker)?.coordinator = Some(coordinator.clone());
                self.broadcast_topology();
            }
            Command::Unjoin => {
                self.leave_group(speaker);
                self.broadcast_topology();
            }
            Command::SwitchToLineIn => self.player_mut(speaker)?.input = InputSource::LineIn,
            Command::SwitchToTv => self.player_mut(speaker)?.input = InputSource::Tv,
            Command::PlayUri { uri, .. } => {
                let player = self.player_mut(speaker)?;
                player.input = InputSource::Media;
                player.media.current_uri = uri.clone();
                player.track.uri = uri.clone();
                player.transport = "PLAYING".to_string();
                self.broadcast_transport(speaker);
            }
            Command::SetTransportUri { uri, metadata } => {
                let player = self.player_mut(speaker)?;
                player.input = InputSource::Media;
                player.media.current_uri = uri.clone();
                player.media.current_uri_metadata = metadata.clone();
                player.track.uri = uri.clone();
            }
            Command::AddUriToQueue { uri, .. } => self.player_mut(speaker)?.queue.push(uri.clone()),
            Command::ClearQueue => self.player_mut(speaker)?.queue.clear(),
            Command::PlayFromQueue(index) => {
                let queue_uri = format!("x-rincon-queue:{}#0", speaker);
                let player = self.player_mut(speaker)?;
                let track_uri = player
                    .queue
                    .get(*index as usize)
                    .cloned()
                    .ok_or(ApiError::SoapFault(711))?;
                player.input = InputSource::Media;
                player.media.current_uri = queue_uri;
                player.track.uri = track_uri;
                player.track.queue_position = Some(index + 1);
                player.transport = "PLAYING".to_string();
                self.broadcast_transport(speaker);
            }
            Command::SetSleepTimer(timer) => self.player_mut(speaker)?.sleep_timer = *timer,
            Command::UpdateAlarm(update) => {
                if !self.alarms.contains(&update.alarm_id) {
                    return Err(ApiError::NotFound(format!("alarm {}", update.alarm_id)));
                }
            }
            Command::SetNightMode(on) => {
                let rendering = &mut self.player_mut(speaker)?.rendering;
                if rendering.night_mode.is_none() {
                    return Err(ApiError::SoapFault(402));
                }
                rendering.night_mode = Some(*on);
            }
            Command::SetDialogMode(on) => {
                let rendering = &mut self.player_mut(speaker)?.rendering;
                if rendering.dialog_mode.is_none() {
                    return Err(ApiError::SoapFault(402));
                }
                rendering.dialog_mode = Some(*on);
            }
        }
        Ok(())
    }

    fn initial_event(&self, speaker: &SpeakerId, service: Service) -> Option<EventData> {
        match service {
            Service::AVTransport => self.transport_event(speaker),
            Service::RenderingControl => self.rendering_event(speaker),
            Service::ZoneGroupTopology => Some(self.topology_event(speaker)),
            Service::ContentDirectory => Some(EventData::ContentDirectory(ContentEvent {
                container_update_ids: Some("FV:2,2".to_string()),
            })),
        }
    }
}

/// Simulated household implementing [`DeviceProxy`]
#[derive(Clone, Default)]
pub struct FakeHousehold {
    state: Arc<Mutex<Household>>,
}

impl FakeHousehold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Living room (Playbar), kitchen and office, all ungrouped
    pub fn three_rooms() -> Self {
        let household = Self::new();
        household.add_player(LIVING_ROOM, Player::new("Living Room", "Sonos Playbar"));
        household.add_player(KITCHEN, Player::new("Kitchen", "Sonos One"));
        household.add_player(OFFICE, Player::new("Office", "Sonos PLAY:5"));
        household
    }

    pub fn add_player(&self, raw_id: &str, player: Player) {
        self.state.lock().players.insert(id(raw_id), player);
    }

    pub fn set_favorites(&self, favorites: Vec<Favorite>) {
        self.state.lock().favorites = favorites;
    }

    pub fn add_alarm(&self, alarm_id: &str) {
        self.state.lock().alarms.push(alarm_id.to_string());
    }

    /// Accept subscriptions but deliver nothing, like a blocked callback port
    pub fn block_events(&self, blocked: bool) {
        self.state.lock().block_events = blocked;
    }

    pub fn set_reachable(&self, raw_id: &str, reachable: bool) {
        if let Some(player) = self.state.lock().players.get_mut(&id(raw_id)) {
            player.reachable = reachable;
        }
    }

    /// Make every `command` sent to `raw_id` fail with `error`
    pub fn fail_command(&self, raw_id: &str, command: &'static str, error: ApiError) {
        self.state
            .lock()
            .failures
            .insert((id(raw_id), command), error);
    }

    /// Change a player behind the engine's back; no event is sent
    pub fn update_player(&self, raw_id: &str, f: impl FnOnce(&mut Player)) {
        if let Some(player) = self.state.lock().players.get_mut(&id(raw_id)) {
            f(player);
        }
    }

    /// Push a transport event with an arbitrary state
    pub fn emit_transport_state(&self, raw_id: &str, state: &str) {
        let household = self.state.lock();
        household.emit(
            &id(raw_id),
            EventData::AVTransport(TransportEvent {
                transport_state: Some(state.to_string()),
                ..Default::default()
            }),
        );
    }

    /// Push a topology event with an arbitrary member attribute
    pub fn emit_topology(&self, raw_id: &str, members: Option<&str>) {
        let household = self.state.lock();
        household.emit(
            &id(raw_id),
            EventData::ZoneGroupTopology(TopologyEvent {
                zone_player_uuids_in_group: members.map(str::to_string),
            }),
        );
    }

    pub fn player(&self, raw_id: &str) -> Option<Player> {
        self.state.lock().players.get(&id(raw_id)).cloned()
    }

    pub fn group_of(&self, raw_id: &str) -> Vec<SpeakerId> {
        self.state.lock().group_of(&id(raw_id))
    }

    /// Every command received so far, in order
    pub fn commands(&self) -> Vec<(SpeakerId, Command)> {
        self.state.lock().commands.clone()
    }

    pub fn commands_to(&self, raw_id: &str) -> Vec<Command> {
        let target = id(raw_id);
        self.commands()
            .into_iter()
            .filter(|(speaker, _)| *speaker == target)
            .map(|(_, command)| command)
            .collect()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    pub fn subscription_count(&self, raw_id: &str) -> usize {
        let target = id(raw_id);
        self.state
            .lock()
            .sinks
            .keys()
            .filter(|(speaker, _)| *speaker == target)
            .count()
    }
}

impl DeviceProxy for FakeHousehold {
    fn speaker_info(&self, speaker: &SpeakerId) -> Result<SpeakerInfo> {
        Ok(self.state.lock().player(speaker)?.info.clone())
    }

    fn transport_info(&self, speaker: &SpeakerId) -> Result<TransportInfo> {
        let household = self.state.lock();
        let player = household.player(speaker)?;
        Ok(TransportInfo {
            state: player.transport.clone(),
            shuffle: player.shuffle,
        })
    }

    fn track_info(&self, speaker: &SpeakerId) -> Result<TrackInfo> {
        Ok(self.state.lock().player(speaker)?.track.clone())
    }

    fn media_info(&self, speaker: &SpeakerId) -> Result<MediaInfo> {
        Ok(self.state.lock().player(speaker)?.media.clone())
    }

    fn rendering_info(&self, speaker: &SpeakerId) -> Result<RenderingInfo> {
        Ok(self.state.lock().player(speaker)?.rendering)
    }

    fn input_source(&self, speaker: &SpeakerId) -> Result<InputSource> {
        Ok(self.state.lock().player(speaker)?.input)
    }

    fn group_view(&self, speaker: &SpeakerId) -> Result<GroupView> {
        let household = self.state.lock();
        household.player(speaker)?;
        let members = household.group_of(speaker);
        Ok(GroupView {
            coordinator: members[0].clone(),
            members,
        })
    }

    fn favorites(&self, speaker: &SpeakerId) -> Result<Vec<Favorite>> {
        let household = self.state.lock();
        household.player(speaker)?;
        Ok(household.favorites.clone())
    }

    fn probe(&self, speaker: &SpeakerId, _timeout: Duration) -> bool {
        self.state.lock().player(speaker).is_ok()
    }

    fn send_command(&self, speaker: &SpeakerId, command: &Command) -> Result<()> {
        let mut household = self.state.lock();
        household.commands.push((speaker.clone(), command.clone()));
        if let Some(error) = household.failures.get(&(speaker.clone(), command.name())) {
            return Err(error.clone());
        }
        household.apply(speaker, command)
    }

    fn subscribe(
        &self,
        speaker: &SpeakerId,
        service: Service,
        sink: EventSink,
    ) -> Result<Box<dyn EventSubscription>> {
        let mut household = self.state.lock();
        household.player(speaker)?;
        household.sinks.insert((speaker.clone(), service), sink);
        if let Some(event) = household.initial_event(speaker, service) {
            household.emit(speaker, event);
        }
        Ok(Box::new(FakeSubscription {
            state: Arc::clone(&self.state),
            speaker: speaker.clone(),
            service,
        }))
    }
}

struct FakeSubscription {
    state: Arc<Mutex<Household>>,
    speaker: SpeakerId,
    service: Service,
}

impl EventSubscription for FakeSubscription {
    fn service(&self) -> Service {
        self.service
    }

    fn unsubscribe(&mut self) -> Result<()> {
        self.state
            .lock()
            .sinks
            .remove(&(self.speaker.clone(), self.service));
        Ok(())
    }
}

// ============================================================================
// Engine helpers
// ============================================================================

/// Short waits so timeouts show up quickly; cached group views never expire
pub fn test_config() -> EngineConfig {
    EngineConfig {
        convergence_timeout: Duration::from_secs(2),
        group_view_ttl: Duration::from_secs(60),
        worker_threads: 4,
        ..EngineConfig::default()
    }
}

/// Route engine logs through the test harness; set RUST_LOG to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn engine_with(household: &FakeHousehold, config: EngineConfig) -> SyncEngine {
    init_tracing();
    let engine = SyncEngine::new(Arc::new(household.clone()), config).unwrap();
    let speakers: Vec<SpeakerId> = household.state.lock().players.keys().cloned().collect();
    for speaker in speakers {
        engine.add_device(&speaker).await.unwrap();
    }
    engine
}

pub async fn engine_for(household: &FakeHousehold) -> SyncEngine {
    engine_with(household, test_config()).await
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
