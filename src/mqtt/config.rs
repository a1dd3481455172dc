//! Broker connection settings and their translation into rumqttc options.

use super::error::ConfigError;
use rumqttc::{MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Port used when the broker URL does not name one
pub const DEFAULT_PORT: u16 = 1883;

/// Static connection settings for the MQTT service.
///
/// Defaults match the demo broker the application was written against. The
/// values are read once when the service connects and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL, e.g. `tcp://10.0.2.19:1883`
    pub broker_url: String,
    /// Client identifier sent in CONNECT
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// Seconds to wait for CONNACK
    pub connection_timeout: u64,
    /// Keep-alive interval in seconds, 0 disables it
    pub keep_alive_interval: u64,
    pub clean_session: bool,
    /// QoS used for subscriptions and publishes (0, 1 or 2)
    pub qos_level: u8,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "tcp://10.0.2.19:1883".to_string(),
            client_id: "android_mqtt_demo".to_string(),
            username: "admin".to_string(),
            password: "123456".to_string(),
            connection_timeout: 30,
            keep_alive_interval: 60,
            clean_session: true,
            qos_level: 1,
        }
    }
}

/// Host and port extracted from a broker URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl BrokerAddress {
    /// Parses `tcp://host:port`, `mqtt://host:port`, `host:port` or `host`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        let rest = match url.split_once("://") {
            Some((scheme, rest)) => {
                if !matches!(scheme.to_ascii_lowercase().as_str(), "tcp" | "mqtt") {
                    return Err(ConfigError::UnsupportedScheme(scheme.to_string()));
                }
                rest
            }
            None => url,
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    ConfigError::InvalidBrokerUrl(url.to_string(), format!("bad port: {}", e))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::InvalidBrokerUrl(
                url.to_string(),
                "missing host".to_string(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl MqttConfig {
    pub fn broker_address(&self) -> Result<BrokerAddress, ConfigError> {
        BrokerAddress::parse(&self.broker_url)
    }

    pub fn qos(&self) -> Result<QoS, ConfigError> {
        match self.qos_level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }

    /// Checks everything rumqttc would otherwise assert on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker_address()?;
        self.qos()?;
        if self.client_id.is_empty() && !self.clean_session {
            return Err(ConfigError::InvalidOptions(
                "an empty client id requires a clean session".to_string(),
            ));
        }
        if self.connection_timeout == 0 {
            return Err(ConfigError::InvalidOptions(
                "connection timeout must be at least 1s".to_string(),
            ));
        }
        // CONNECT carries keep-alive as u16
        if self.keep_alive_interval > u64::from(u16::MAX) {
            return Err(ConfigError::InvalidOptions(format!(
                "keep-alive must not exceed {}s",
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Builds rumqttc options from the settings.
    pub fn mqtt_options(&self) -> Result<MqttOptions, ConfigError> {
        self.validate()?;
        let address = self.broker_address()?;

        let mut options = MqttOptions::new(self.client_id.clone(), address.host, address.port);
        options
            .set_keep_alive(Duration::from_secs(self.keep_alive_interval))
            .set_clean_session(self.clean_session);

        if !self.username.is_empty() {
            options.set_credentials(self.username.clone(), self.password.clone());
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_broker() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_url, "tcp://10.0.2.19:1883");
        assert_eq!(config.client_id, "android_mqtt_demo");
        assert_eq!(config.connection_timeout, 30);
        assert_eq!(config.keep_alive_interval, 60);
        assert!(config.clean_session);
        assert_eq!(config.qos().unwrap(), QoS::AtLeastOnce);
    }

    #[test]
    fn parses_broker_url_forms() {
        let addr = BrokerAddress::parse("tcp://10.0.2.19:1883").unwrap();
        assert_eq!(addr.host, "10.0.2.19");
        assert_eq!(addr.port, 1883);

        let addr = BrokerAddress::parse("mqtt://broker.local:8883/").unwrap();
        assert_eq!(addr.to_string(), "broker.local:8883");

        let addr = BrokerAddress::parse("localhost").unwrap();
        assert_eq!(addr.port, DEFAULT_PORT);
    }

    #[test]
    fn rejects_bad_broker_urls() {
        assert_eq!(
            BrokerAddress::parse("ssl://host:8883"),
            Err(ConfigError::UnsupportedScheme("ssl".to_string()))
        );
        assert!(matches!(
            BrokerAddress::parse("tcp://host:notaport"),
            Err(ConfigError::InvalidBrokerUrl(_, _))
        ));
        assert!(matches!(
            BrokerAddress::parse("tcp://:1883"),
            Err(ConfigError::InvalidBrokerUrl(_, _))
        ));
    }

    #[test]
    fn qos_levels() {
        let mut config = MqttConfig::default();
        config.qos_level = 0;
        assert_eq!(config.qos().unwrap(), QoS::AtMostOnce);
        config.qos_level = 2;
        assert_eq!(config.qos().unwrap(), QoS::ExactlyOnce);
        config.qos_level = 3;
        assert_eq!(config.qos(), Err(ConfigError::InvalidQos(3)));
    }

    #[test]
    fn builds_options() {
        let options = MqttConfig::default().mqtt_options().unwrap();
        assert_eq!(options.broker_address(), ("10.0.2.19".to_string(), 1883));
        assert_eq!(options.client_id(), "android_mqtt_demo");
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert!(options.clean_session());
    }

    #[test]
    fn validation_catches_options_rumqttc_would_reject() {
        let config = MqttConfig {
            client_id: String::new(),
            clean_session: false,
            ..MqttConfig::default()
        };
        assert!(matches!(
            config.mqtt_options(),
            Err(ConfigError::InvalidOptions(_))
        ));
    }

    #[test]
    fn keep_alive_must_fit_connect_packet() {
        let config = MqttConfig {
            keep_alive_interval: u64::from(u16::MAX) + 1,
            ..MqttConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOptions(_))
        ));

        let config = MqttConfig {
            keep_alive_interval: u64::from(u16::MAX),
            ..MqttConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
