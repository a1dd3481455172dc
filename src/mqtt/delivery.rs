//! Maps packet ids back to topics so delivery events can name the topic.
//!
//! rumqttc reports an outgoing publish as `Outgoing::Publish(pkid)` and the
//! acknowledgement as `PubAck`/`PubComp` carrying only the packet id. Publishes
//! leave the event loop in request order, so topics are queued at publish time
//! and bound to a packet id when the outgoing event shows up.

use rumqttc::QoS;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct DeliveryTracker {
    queued: VecDeque<(String, QoS)>,
    in_flight: HashMap<u16, String>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a publish that was handed to the client.
    pub fn queue(&mut self, topic: String, qos: QoS) {
        self.queued.push_back((topic, qos));
    }

    /// Drops the newest queued publish after the client rejected it.
    pub fn discard_last(&mut self) {
        self.queued.pop_back();
    }

    /// Binds the oldest queued publish to `pkid`.
    ///
    /// Returns the topic right away for QoS 0, which has no acknowledgement.
    pub fn on_sent(&mut self, pkid: u16) -> Option<String> {
        let Some((topic, qos)) = self.queued.pop_front() else {
            warn!("Outgoing publish {} without queued topic", pkid);
            return None;
        };

        match qos {
            QoS::AtMostOnce => Some(topic),
            QoS::AtLeastOnce | QoS::ExactlyOnce => {
                debug!("Publish {} to {} awaiting acknowledgement", pkid, topic);
                self.in_flight.insert(pkid, topic);
                None
            }
        }
    }

    /// Resolves PUBACK (QoS 1) or PUBCOMP (QoS 2).
    pub fn on_acknowledged(&mut self, pkid: u16) -> Option<String> {
        self.in_flight.remove(&pkid)
    }

    pub fn pending(&self) -> usize {
        self.queued.len() + self.in_flight.len()
    }

    pub fn clear(&mut self) {
        self.queued.clear();
        self.in_flight.clear();
    }
}
