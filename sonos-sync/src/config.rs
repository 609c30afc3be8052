//! Engine configuration
//!
//! Every field has a default, so hosts only spell out what they change.
//! Durations are milliseconds in serialized form:
//!
//! ```json
//! { "convergence_timeout": 8000, "worker_threads": 4 }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sonos_api::IGNORABLE_TRANSPORT_FAULTS;

use crate::{Result, SyncError};

/// Configuration for the [`SyncEngine`](crate::SyncEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long group mutations wait for topology to converge
    /// Default: 5 seconds
    #[serde(with = "duration_ms")]
    pub convergence_timeout: Duration,

    /// Position difference that counts as a seek rather than clock jitter
    /// Default: 1.5 seconds
    #[serde(with = "duration_ms")]
    pub drift_threshold: Duration,

    /// Reachability probe timeout
    /// Default: 3 seconds
    #[serde(with = "duration_ms")]
    pub probe_timeout: Duration,

    /// Period of the background refresh loop
    /// Default: 10 seconds
    #[serde(with = "duration_ms")]
    pub refresh_interval: Duration,

    /// Lifetime of cached group view polls
    /// Default: 2 seconds
    #[serde(with = "duration_ms")]
    pub group_view_ttl: Duration,

    /// Maximum number of device calls in flight
    /// Default: 8
    pub worker_threads: usize,

    /// Volume change of a single volume up/down step
    /// Default: 2
    pub volume_step: u8,

    /// UPnP fault codes plain transport commands treat as no-ops
    /// Default: 701, 711, 712
    pub ignorable_fault_codes: Vec<u16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            convergence_timeout: Duration::from_secs(5),
            drift_threshold: Duration::from_millis(1500),
            probe_timeout: Duration::from_secs(3),
            refresh_interval: Duration::from_secs(10),
            group_view_ttl: Duration::from_secs(2),
            worker_threads: 8,
            volume_step: 2,
            ignorable_fault_codes: IGNORABLE_TRANSPORT_FAULTS.to_vec(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts for small households on a fast network
    pub fn fast() -> Self {
        Self {
            convergence_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(1),
            refresh_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Fewer calls in flight and a slower refresh loop
    pub fn conservative() -> Self {
        Self {
            convergence_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            worker_threads: 2,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("convergence_timeout", self.convergence_timeout),
            ("drift_threshold", self.drift_threshold),
            ("probe_timeout", self.probe_timeout),
            ("refresh_interval", self.refresh_interval),
        ];
        for (name, value) in positive {
            if value.is_zero() {
                return Err(SyncError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if self.worker_threads == 0 {
            return Err(SyncError::Configuration(
                "worker_threads must be greater than 0".to_string(),
            ));
        }

        if self.volume_step == 0 || self.volume_step > 100 {
            return Err(SyncError::Configuration(
                "volume_step must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
