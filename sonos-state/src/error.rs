//! Error types for sonos-state

use thiserror::Error;

use crate::model::SpeakerId;

/// Result type for sonos-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur during state management
#[derive(Debug, Error)]
pub enum StateError {
    /// Speaker not registered
    #[error("Speaker not found: {0}")]
    SpeakerNotFound(SpeakerId),

    /// Speaker registered twice
    #[error("Speaker already registered: {0}")]
    AlreadyRegistered(SpeakerId),

    /// Group membership is inconsistent between devices
    #[error("Topology invariant violated: {0}")]
    InvariantViolation(String),

    /// Error parsing device data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error from the device proxy
    #[error("API error: {0}")]
    Api(#[from] sonos_api::ApiError),
}
