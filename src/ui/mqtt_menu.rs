use crate::mqtt::{MqttService, ServiceEvent};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::common::{Controls, LogView, StatusLabel};

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Subscribe(String),
    Unsubscribe(String),
    Publish { topic: String, message: String },
    Status,
    Log,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}', type 'help' for a list")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "connect" => Ok(Command::Connect),
            "disconnect" => Ok(Command::Disconnect),
            "sub" | "subscribe" => Ok(Command::Subscribe(rest.to_string())),
            "unsub" | "unsubscribe" => Ok(Command::Unsubscribe(rest.to_string())),
            "pub" | "publish" => {
                let (topic, message) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Ok(Command::Publish {
                    topic: topic.trim().to_string(),
                    message: message.trim().to_string(),
                })
            }
            "status" => Ok(Command::Status),
            "log" => Ok(Command::Log),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Whether the console keeps running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFlow {
    Continue,
    Quit,
}

/// State of the MQTT console screen
pub struct MqttMenu {
    service: Arc<MqttService>,
    log: LogView,
    status: StatusLabel,
    controls: Controls,
    output: Vec<String>,
}

impl MqttMenu {
    pub fn new(service: Arc<MqttService>) -> Self {
        Self {
            service,
            log: LogView::new(),
            status: StatusLabel::default(),
            controls: Controls::default(),
            output: Vec::new(),
        }
    }

    pub fn log(&self) -> &LogView {
        &self.log
    }

    pub fn status(&self) -> &StatusLabel {
        &self.status
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    /// Lines produced since the last call
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn append_log(&mut self, message: &str) {
        let line = self.log.append(message).to_string();
        self.output.push(line);
    }

    /// Short prompt that is shown but not logged
    fn prompt(&mut self, message: &str) {
        self.output.push(format!("! {}", message));
    }

    fn set_connected(&mut self, connected: bool, status: &str) {
        self.status.set(status);
        self.controls = if connected {
            Controls::connected()
        } else {
            Controls::disconnected()
        };
    }

    pub async fn handle_command(&mut self, command: Command) -> MenuFlow {
        debug!("Handling command {:?}", command);
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect => self.disconnect().await,
            Command::Subscribe(topic) => self.subscribe(&topic).await,
            Command::Unsubscribe(topic) => self.unsubscribe(&topic).await,
            Command::Publish { topic, message } => self.publish(&topic, &message).await,
            Command::Status => {
                let status = self.status.to_string();
                let enabled = self.controls.enabled().join(", ");
                self.output.push(status);
                self.output.push(format!("Enabled: {}", enabled));
            }
            Command::Log => {
                let entries = self.log.entries().to_vec();
                self.output.extend(entries);
            }
            Command::Help => self.output.extend(HELP.lines().map(str::to_string)),
            Command::Quit => {
                info!("Quit requested");
                return MenuFlow::Quit;
            }
        }
        MenuFlow::Continue
    }

    fn connect(&mut self) {
        if self.service.is_connected() {
            self.append_log("Already connected to the MQTT broker");
            return;
        }
        if self.service.is_connecting() {
            self.append_log("Connection attempt already in progress");
            return;
        }
        self.append_log("Connecting to the MQTT broker...");
        if let Err(e) = self.service.connect() {
            // already reported through the callback
            debug!("Connect rejected: {}", e);
        }
    }

    async fn disconnect(&mut self) {
        if !self.service.is_connected() {
            self.append_log("Not connected to the MQTT broker");
            return;
        }
        self.append_log("Disconnecting from the MQTT broker...");
        match self.service.disconnect().await {
            Ok(()) => self.set_connected(false, "Disconnected"),
            Err(e) => self.append_log(&format!("Disconnect failed: {}", e)),
        }
    }

    async fn subscribe(&mut self, topic: &str) {
        if !self.service.is_connected() {
            self.append_log("Please connect to the MQTT broker first");
            return;
        }
        let topic = topic.trim();
        if topic.is_empty() {
            self.prompt("Please enter a topic name");
            return;
        }
        self.append_log(&format!("Subscribing to topic: {}", topic));
        if let Err(e) = self.service.subscribe(topic).await {
            self.append_log(&format!("Subscribe failed: {}", e));
        }
    }

    async fn unsubscribe(&mut self, topic: &str) {
        if !self.service.is_connected() {
            self.append_log("Please connect to the MQTT broker first");
            return;
        }
        let topic = topic.trim();
        if topic.is_empty() {
            self.prompt("Please enter a topic name");
            return;
        }
        self.append_log(&format!("Unsubscribing from topic: {}", topic));
        if let Err(e) = self.service.unsubscribe(topic).await {
            self.append_log(&format!("Unsubscribe failed: {}", e));
        }
    }

    async fn publish(&mut self, topic: &str, message: &str) {
        if !self.service.is_connected() {
            self.append_log("Please connect to the MQTT broker first");
            return;
        }
        let (topic, message) = (topic.trim(), message.trim());
        if topic.is_empty() || message.is_empty() {
            self.prompt("Please enter a topic name and a message");
            return;
        }
        self.append_log(&format!("Publishing to topic {}: {}", topic, message));
        if let Err(e) = self.service.publish(topic, message).await {
            self.append_log(&format!("Publish failed: {}", e));
        }
    }

    /// Renders a callback from the service.
    pub fn handle_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Connected => {
                self.append_log("MQTT connected!");
                self.set_connected(true, "Connected");
            }
            ServiceEvent::ConnectionFailed(error) => {
                self.append_log(&format!("MQTT connection failed: {}", error));
                self.set_connected(false, "Connection failed");
            }
            ServiceEvent::MessageReceived(msg) => {
                self.append_log(&format!(
                    "Message received - topic: {}, content: {}",
                    msg.topic, msg.content
                ));
            }
            ServiceEvent::MessageDelivered(topic) => {
                self.append_log(&format!("Message delivered - topic: {}", topic));
            }
        }
    }
}

const HELP: &str = "\
Commands:
  connect                  connect to the broker
  disconnect               disconnect from the broker
  sub <topic>              subscribe to a topic
  unsub <topic>            unsubscribe from a topic
  pub <topic> <message>    publish a message
  status                   show connection status
  log                      show the full log
  help                     show this help
  quit                     disconnect and exit";
