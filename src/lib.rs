//! Terminal client for an MQTT broker.
//!
//! Connects, subscribes, unsubscribes and publishes short text messages through
//! `rumqttc`, and shows connection and delivery events in a console log.

pub mod config;
pub mod mqtt;
pub mod ui;
