//! Per-device event delivery tracking
//!
//! A subscription can be accepted by the device and still never deliver,
//! typically when a firewall blocks the callback. Channels that have not
//! delivered anything since they were subscribed are polled instead. Once a
//! channel delivered, it counts as live until the device is resubscribed.

use std::collections::HashSet;

use sonos_api::Service;

#[derive(Debug, Clone, Default)]
pub struct EventActivity {
    subscribed: HashSet<Service>,
    delivered: HashSet<Service>,
}

impl EventActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_subscribed(&mut self, service: Service) {
        self.subscribed.insert(service);
    }

    /// Forget all subscriptions, e.g. after the device went away
    pub fn clear(&mut self) {
        self.subscribed.clear();
        self.delivered.clear();
    }

    pub fn record(&mut self, service: Service) {
        self.delivered.insert(service);
    }

    /// Channels that must be polled: unsubscribed or never delivered
    pub fn silent_channels(&self) -> Vec<Service> {
        Service::ALL
            .into_iter()
            .filter(|service| {
                !self.subscribed.contains(service) || !self.delivered.contains(service)
            })
            .collect()
    }
}
