//! Error definitions for the MQTT module

use rumqttc::ConnectReturnCode;
use thiserror::Error;

/// Problems with the broker settings, detected before rumqttc is touched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The broker URL could not be split into host and port
    #[error("Invalid broker URL '{0}': {1}")]
    InvalidBrokerUrl(String, String),

    /// Only plain TCP is supported
    #[error("Unsupported broker scheme '{0}'")]
    UnsupportedScheme(String),

    /// QoS must be 0, 1 or 2
    #[error("Invalid QoS level: {0}")]
    InvalidQos(u8),

    /// Options rumqttc would reject at runtime
    #[error("Invalid connection options: {0}")]
    InvalidOptions(String),
}

/// Errors reported by the MQTT service facade
#[derive(Debug, Error)]
pub enum MqttError {
    /// The configuration could not be turned into client options
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request could not be handed to the client
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The event loop failed
    #[error("Connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The broker answered CONNACK with a failure code
    #[error("Connection refused: {0:?}")]
    Refused(ConnectReturnCode),

    /// No CONNACK arrived in time
    #[error("Connection timed out after {0}s")]
    Timeout(u64),

    /// Internal channel closed
    #[error("Channel error: {0}")]
    ChannelError(String),
}
