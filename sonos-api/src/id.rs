//! Speaker identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Sonos speaker
///
/// Typically the UUID from the UPnP device description ("RINCON_..."),
/// normalized to strip the "uuid:" prefix if present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeakerId(String);

impl SpeakerId {
    /// Creates a new SpeakerId, normalizing the format
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        match id.strip_prefix("uuid:") {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpeakerId {
    fn from(s: &str) -> Self {
        SpeakerId::new(s)
    }
}

impl From<String> for SpeakerId {
    fn from(s: String) -> Self {
        SpeakerId::new(s)
    }
}
