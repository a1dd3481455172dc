//! # MQTT Integration Module
//!
//! Connects the console to an MQTT broker through `rumqttc`. The module does not
//! implement any protocol itself; it wraps the client in a small facade that
//! tracks a single connection flag and re-emits the client's events through the
//! [`callback::MqttCallback`] listener.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── callback.rs         - Listener interface for the four service events
//! ├── config.rs           - Broker settings and rumqttc option building
//! ├── delivery.rs         - Packet id to topic bookkeeping for delivery events
//! ├── error.rs            - ConfigError and MqttError
//! ├── message_manager.rs  - Message representation and the channel bridge
//! ├── mqtt_handler.rs     - The service facade and its event-loop task
//! └── transport.rs        - Client seam, mocked in tests
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mqtt_console::mqtt::{ChannelCallback, MqttConfig, MqttService};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MqttService::new(MqttConfig::default());
//! let (callback, mut events) = ChannelCallback::channel(100);
//! service.set_callback(Arc::new(callback));
//!
//! service.connect()?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod config;
pub mod delivery;
pub mod error;
pub mod message_manager;
pub mod mqtt_handler;
pub mod transport;

pub use callback::MqttCallback;
pub use config::{BrokerAddress, MqttConfig};
pub use error::{ConfigError, MqttError};
pub use message_manager::{ChannelCallback, MqttMessage, ServiceEvent};
pub use mqtt_handler::MqttService;
