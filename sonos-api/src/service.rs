/// Event channels a Sonos device publishes
///
/// Each service is an independent UPnP event source. A device can stop
/// delivering on one channel while the others keep working, so the engine
/// tracks activity per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Service {
    /// AVTransport service - playback state, current track, transport URI
    AVTransport,

    /// RenderingControl service - volume, mute, night sound, speech enhancement
    RenderingControl,

    /// ZoneGroupTopology service - group membership
    ZoneGroupTopology,

    /// ContentDirectory service - favorites and library updates
    ContentDirectory,
}

impl Service {
    /// All services the engine subscribes to, in subscription order
    pub const ALL: [Service; 4] = [
        Service::AVTransport,
        Service::RenderingControl,
        Service::ZoneGroupTopology,
        Service::ContentDirectory,
    ];

    /// Get the name of this service as a string
    pub fn name(&self) -> &'static str {
        match self {
            Service::AVTransport => "AVTransport",
            Service::RenderingControl => "RenderingControl",
            Service::ZoneGroupTopology => "ZoneGroupTopology",
            Service::ContentDirectory => "ContentDirectory",
        }
    }

    /// UPnP service URI, used when logging subscription failures
    pub fn service_uri(&self) -> &'static str {
        match self {
            Service::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Service::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
            Service::ZoneGroupTopology => "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
            Service::ContentDirectory => "urn:schemas-upnp-org:service:ContentDirectory:1",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
