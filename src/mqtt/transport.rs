//! Seam between the service facade and the rumqttc client.

use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

use super::error::MqttError;

/// Requests the facade hands to the underlying client.
///
/// `rumqttc::AsyncClient` only queues requests for the event loop, so every
/// call returns as soon as the request is accepted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MqttTransport: Send + Sync {
    async fn subscribe(&self, topic: String, qos: QoS) -> Result<(), MqttError>;
    async fn unsubscribe(&self, topic: String) -> Result<(), MqttError>;
    async fn publish(&self, topic: String, qos: QoS, payload: Vec<u8>) -> Result<(), MqttError>;
    async fn disconnect(&self) -> Result<(), MqttError>;
}

#[async_trait]
impl MqttTransport for AsyncClient {
    async fn subscribe(&self, topic: String, qos: QoS) -> Result<(), MqttError> {
        AsyncClient::subscribe(self, topic, qos).await?;
        Ok(())
    }

    async fn unsubscribe(&self, topic: String) -> Result<(), MqttError> {
        AsyncClient::unsubscribe(self, topic).await?;
        Ok(())
    }

    async fn publish(&self, topic: String, qos: QoS, payload: Vec<u8>) -> Result<(), MqttError> {
        AsyncClient::publish(self, topic, qos, false, payload).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        AsyncClient::disconnect(self).await?;
        Ok(())
    }
}
