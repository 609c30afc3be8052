//! Commands the engine sends to a device
//!
//! Commands are plain data; the [`DeviceProxy`](crate::DeviceProxy) turns them
//! into SOAP actions. Keeping them as values lets the engine decide routing
//! (coordinator or the addressed speaker) and fault policy before anything
//! touches the network.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Service, SpeakerId};

/// UPnP fault codes that transport commands treat as no-ops
///
/// 701: transition not available, 711: illegal seek target,
/// 712: play mode not supported.
pub const IGNORABLE_TRANSPORT_FAULTS: [u16; 3] = [701, 711, 712];

/// Partial update of an existing alarm
///
/// Unset fields are left as the device has them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmUpdate {
    pub alarm_id: String,
    pub time: Option<String>,
    pub volume: Option<u8>,
    pub enabled: Option<bool>,
    pub include_linked_zones: Option<bool>,
}

/// A single device command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Seek within the current track
    Seek(Duration),
    /// Jump to a queue entry (1-based, as the device reports it)
    SeekTrack(u32),
    SetShuffle(bool),
    SetVolume(u8),
    SetMute(bool),
    /// Make the addressed device follow `coordinator`
    Join { coordinator: SpeakerId },
    /// Make the addressed device leave its group
    Unjoin,
    SwitchToLineIn,
    SwitchToTv,
    /// Start playing a stream URI, optionally labelled with a title
    PlayUri { uri: String, title: Option<String> },
    SetTransportUri { uri: String, metadata: Option<String> },
    AddUriToQueue { uri: String, metadata: Option<String> },
    ClearQueue,
    /// Play the queue starting at a zero-based index
    PlayFromQueue(u32),
    /// `None` clears the timer
    SetSleepTimer(Option<Duration>),
    UpdateAlarm(AlarmUpdate),
    SetNightMode(bool),
    SetDialogMode(bool),
}

impl Command {
    /// Action name, used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play => "Play",
            Command::Pause => "Pause",
            Command::Stop => "Stop",
            Command::Next => "Next",
            Command::Previous => "Previous",
            Command::Seek(_) => "Seek",
            Command::SeekTrack(_) => "SeekTrack",
            Command::SetShuffle(_) => "SetShuffle",
            Command::SetVolume(_) => "SetVolume",
            Command::SetMute(_) => "SetMute",
            Command::Join { .. } => "Join",
            Command::Unjoin => "Unjoin",
            Command::SwitchToLineIn => "SwitchToLineIn",
            Command::SwitchToTv => "SwitchToTv",
            Command::PlayUri { .. } => "PlayUri",
            Command::SetTransportUri { .. } => "SetTransportUri",
            Command::AddUriToQueue { .. } => "AddUriToQueue",
            Command::ClearQueue => "ClearQueue",
            Command::PlayFromQueue(_) => "PlayFromQueue",
            Command::SetSleepTimer(_) => "SetSleepTimer",
            Command::UpdateAlarm(_) => "UpdateAlarm",
            Command::SetNightMode(_) => "SetNightMode",
            Command::SetDialogMode(_) => "SetDialogMode",
        }
    }

    /// Service the command belongs to
    pub fn service(&self) -> Service {
        match self {
            Command::SetVolume(_)
            | Command::SetMute(_)
            | Command::SetNightMode(_)
            | Command::SetDialogMode(_) => Service::RenderingControl,
            Command::Join { .. } | Command::Unjoin => Service::ZoneGroupTopology,
            Command::UpdateAlarm(_) => Service::ContentDirectory,
            _ => Service::AVTransport,
        }
    }

    /// Plain transport controls, which tolerate the faults in
    /// [`IGNORABLE_TRANSPORT_FAULTS`]
    pub fn is_transport_control(&self) -> bool {
        matches!(
            self,
            Command::Play
                | Command::Pause
                | Command::Stop
                | Command::Next
                | Command::Previous
                | Command::Seek(_)
                | Command::SetShuffle(_)
        )
    }

    /// Whether the command acts on the group and must be sent to its coordinator
    pub fn targets_coordinator(&self) -> bool {
        !matches!(
            self.service(),
            Service::RenderingControl | Service::ZoneGroupTopology
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Command::Play, true, true)]
    #[case(Command::Seek(Duration::from_secs(3)), true, true)]
    #[case(Command::ClearQueue, false, true)]
    #[case(Command::SetVolume(10), false, false)]
    #[case(Command::Unjoin, false, false)]
    #[case(Command::SetSleepTimer(None), false, true)]
    #[case(Command::UpdateAlarm(AlarmUpdate::default()), false, true)]
    fn test_routing(
        #[case] command: Command,
        #[case] transport: bool,
        #[case] coordinator: bool,
    ) {
        assert_eq!(command.is_transport_control(), transport);
        assert_eq!(command.targets_coordinator(), coordinator);
    }

    #[test]
    fn test_join_is_topology_command() {
        let cmd = Command::Join {
            coordinator: SpeakerId::new("RINCON_A"),
        };
        assert_eq!(cmd.service(), Service::ZoneGroupTopology);
        assert_eq!(cmd.name(), "Join");
    }
}
