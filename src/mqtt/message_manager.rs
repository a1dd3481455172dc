//! Message representation and the channel bridge between the service
//! callbacks and the console.

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tracing::warn;

use super::callback::MqttCallback;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl MqttMessage {
    pub fn from_topic(topic: String, content: String) -> Self {
        MqttMessage {
            topic,
            content,
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}

/// Channel form of the four service callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Connected,
    ConnectionFailed(String),
    MessageReceived(MqttMessage),
    MessageDelivered(String),
}

/// Forwards every callback into an mpsc channel.
///
/// The service invokes callbacks from the event-loop task, the console drains
/// the receiving half on its own task.
///
/// Callbacks must not block the event loop, so `try_send` is used: once the
/// channel is full, further events are dropped with a warning until the
/// receiver catches up. Size the channel for the largest expected burst of
/// incoming messages.
pub struct ChannelCallback {
    sender: mpsc::Sender<ServiceEvent>,
}

impl ChannelCallback {
    pub fn new(sender: mpsc::Sender<ServiceEvent>) -> Self {
        Self { sender }
    }

    /// Creates the callback together with its receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServiceEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    fn forward(&self, event: ServiceEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping service event: {}", e);
        }
    }
}

impl MqttCallback for ChannelCallback {
    fn on_connection_success(&self) {
        self.forward(ServiceEvent::Connected);
    }

    fn on_connection_failure(&self, error: &str) {
        self.forward(ServiceEvent::ConnectionFailed(error.to_string()));
    }

    fn on_message_received(&self, topic: &str, message: &str) {
        self.forward(ServiceEvent::MessageReceived(MqttMessage::from_topic(
            topic.to_string(),
            message.to_string(),
        )));
    }

    fn on_message_delivered(&self, topic: &str) {
        self.forward(ServiceEvent::MessageDelivered(topic.to_string()));
    }
}
