//! JSON encoding for the message bus.
//!
//! [`JsonBus`] implements [`BusPort`] by encoding each publication with
//! `serde_json` and handing the text to a [`BusTransport`], the thin layer
//! over the actual MQTT client.  Notices go out as plain text.

use log::{debug, warn};

use crate::app::ports::{BusPort, Publication};

/// Raw publish/subscribe transport (an MQTT client, for instance).
pub trait BusTransport {
    /// Returns whether the client accepted the message.
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool;

    fn subscribe(&mut self, topic: &str);
}

pub struct JsonBus<T: BusTransport> {
    transport: T,
}

impl<T: BusTransport> JsonBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Text form of a publication.
pub fn encode(message: Publication<'_>) -> Result<String, serde_json::Error> {
    match message {
        Publication::Device(report) => serde_json::to_string(report),
        Publication::Status(status) => serde_json::to_string(status),
        Publication::Notice(text) => Ok(text.to_owned()),
    }
}

impl<T: BusTransport> BusPort for JsonBus<T> {
    fn publish(&mut self, topic: &str, message: Publication<'_>, retain: bool) -> bool {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Bus: cannot encode message for {}: {}", topic, e);
                return false;
            }
        };
        debug!("Bus: {} <- {}", topic, payload);
        self.transport.publish(topic, &payload, retain)
    }

    fn subscribe(&mut self, topic: &str) {
        debug!("Bus: subscribing to {}", topic);
        self.transport.subscribe(topic);
    }
}
