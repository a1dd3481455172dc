/// Listener for the events the MQTT service re-emits.
///
/// Implementations are called from the event-loop task and must not block.
pub trait MqttCallback: Send + Sync {
    /// CONNACK with success received
    fn on_connection_success(&self);

    /// Connect attempt failed or an established connection was lost
    fn on_connection_failure(&self, error: &str);

    /// A PUBLISH arrived on a subscribed topic
    fn on_message_received(&self, topic: &str, message: &str);

    /// An outgoing publish completed for its QoS level
    fn on_message_delivered(&self, topic: &str);
}
