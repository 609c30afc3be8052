use thiserror::Error;

/// Errors reported by a [`DeviceProxy`](crate::DeviceProxy)
///
/// The proxy hides the wire protocol; what reaches the engine is either a
/// fault the device itself reported (carrying its UPnP error code) or a
/// transport-level problem talking to it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection timeouts, refused connections, truncated responses.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The device did not answer at all
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// Response parsing error
    ///
    /// The device answered but the payload could not be understood.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// SOAP fault returned by device
    ///
    /// Carries the UPnP error code from the fault body, e.g. 701
    /// ("transition not available") when pausing a stopped player.
    #[error("SOAP fault: error code {0}")]
    SoapFault(u16),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Subscription operation failed
    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    /// The addressed object (alarm, favorite, queue entry) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Device operation error
    ///
    /// Unsupported operations or invalid device states.
    #[error("Device error: {0}")]
    DeviceError(String),
}

impl ApiError {
    /// UPnP error code of a device fault, if this is one
    pub fn upnp_code(&self) -> Option<u16> {
        match self {
            ApiError::SoapFault(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether this error is a device fault whose code is listed in `codes`
    pub fn is_ignorable(&self, codes: &[u16]) -> bool {
        self.upnp_code().is_some_and(|code| codes.contains(&code))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
