use thiserror::Error;

use sonos_api::SpeakerId;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("State management error: {0}")]
    State(#[from] sonos_state::StateError),

    #[error("API error: {0}")]
    Api(#[from] sonos_api::ApiError),

    #[error("Speaker not found: {0}")]
    SpeakerNotFound(SpeakerId),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Engine has been shut down")]
    ShutDown,
}

impl SyncError {
    pub fn api(&self) -> Option<&sonos_api::ApiError> {
        match self {
            SyncError::Api(err) => Some(err),
            SyncError::State(sonos_state::StateError::Api(err)) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
