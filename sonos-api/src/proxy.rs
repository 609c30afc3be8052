//! The contract between the engine and whatever talks to real devices

use std::time::Duration;

use crate::{
    Command, EventSink, Favorite, GroupView, InputSource, MediaInfo, RenderingInfo, Result,
    Service, SpeakerId, SpeakerInfo, TrackInfo, TransportInfo,
};

/// Blocking access to the devices of one household
///
/// Every method performs network I/O and may block for as long as the device
/// takes to answer. Callers run them on a worker pool, never on an event
/// dispatch path.
pub trait DeviceProxy: Send + Sync {
    fn speaker_info(&self, speaker: &SpeakerId) -> Result<SpeakerInfo>;

    fn transport_info(&self, speaker: &SpeakerId) -> Result<TransportInfo>;

    fn track_info(&self, speaker: &SpeakerId) -> Result<TrackInfo>;

    fn media_info(&self, speaker: &SpeakerId) -> Result<MediaInfo>;

    fn rendering_info(&self, speaker: &SpeakerId) -> Result<RenderingInfo>;

    fn input_source(&self, speaker: &SpeakerId) -> Result<InputSource>;

    /// The group as the device itself currently reports it
    fn group_view(&self, speaker: &SpeakerId) -> Result<GroupView>;

    fn favorites(&self, speaker: &SpeakerId) -> Result<Vec<Favorite>>;

    /// Cheap reachability check, bounded by `timeout`
    fn probe(&self, speaker: &SpeakerId, timeout: Duration) -> bool;

    fn send_command(&self, speaker: &SpeakerId, command: &Command) -> Result<()>;

    /// Start pushing `service` events of `speaker` into `sink`
    fn subscribe(
        &self,
        speaker: &SpeakerId,
        service: Service,
        sink: EventSink,
    ) -> Result<Box<dyn EventSubscription>>;
}

/// Handle to a live event subscription
pub trait EventSubscription: Send {
    fn service(&self) -> Service;

    /// Stop delivery; further events from this subscription are not sent
    fn unsubscribe(&mut self) -> Result<()>;
}
