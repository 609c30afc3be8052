//! Event decoders for the subscribed services
//!
//! Each decoder handles one service and turns its raw variables into a
//! typed update.

mod content;
mod rendering;
mod topology;
mod transport;

pub use content::ContentDirectoryDecoder;
pub use rendering::RenderingControlDecoder;
pub use topology::TopologyDecoder;
pub use transport::AVTransportDecoder;

use crate::decoder::EventDecoder;

/// Create the default set of decoders for processing Sonos events
pub fn default_decoders() -> [&'static dyn EventDecoder; 4] {
    [
        &AVTransportDecoder,
        &RenderingControlDecoder,
        &TopologyDecoder,
        &ContentDirectoryDecoder,
    ]
}
