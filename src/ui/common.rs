//! # Console Common Components
//!
//! Shared building blocks of the console front end: the append-only log view,
//! the status label and the set of enabled controls.
//!
//! These are plain data holders. The menu in [`super::mqtt_menu`] mutates them
//! in response to commands and service events; the console loop only prints.

use chrono::Local;
use std::fmt;

/// Append-only log, one timestamped line per entry.
#[derive(Debug, Default, Clone)]
pub struct LogView {
    entries: Vec<String>,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `[HH:MM:SS] message` and returns the formatted line.
    pub fn append(&mut self, message: &str) -> &str {
        let timestamp = Local::now().format("%H:%M:%S");
        self.entries.push(format!("[{}] {}", timestamp, message));
        self.entries.last().map(String::as_str).unwrap_or_default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Connection status shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabel {
    text: String,
}

impl Default for StatusLabel {
    fn default() -> Self {
        Self::new("Disconnected")
    }
}

impl StatusLabel {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Status: {}", self.text)
    }
}

/// Which commands are currently enabled.
///
/// Mirrors the button states of a form: connect only while disconnected,
/// everything else only while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect: bool,
    pub disconnect: bool,
    pub subscribe: bool,
    pub unsubscribe: bool,
    pub publish: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl Controls {
    pub fn connected() -> Self {
        Self {
            connect: false,
            disconnect: true,
            subscribe: true,
            unsubscribe: true,
            publish: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connect: true,
            disconnect: false,
            subscribe: false,
            unsubscribe: false,
            publish: false,
        }
    }

    /// Names of the enabled connection commands, in display order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            (self.connect, "connect"),
            (self.disconnect, "disconnect"),
            (self.subscribe, "sub"),
            (self.unsubscribe, "unsub"),
            (self.publish, "pub"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entries_are_timestamped_and_appended() {
        let mut log = LogView::new();
        assert!(log.is_empty());

        let line = log.append("first").to_string();
        log.append("second");

        assert_eq!(log.len(), 2);
        assert!(line.starts_with('['));
        assert!(line.ends_with("] first"));
        // "[HH:MM:SS] "
        assert_eq!(line.find(']'), Some(9));
        assert!(log.entries()[1].ends_with("] second"));
    }

    #[test]
    fn status_label_renders_prefix() {
        let mut status = StatusLabel::default();
        assert_eq!(status.to_string(), "Status: Disconnected");
        status.set("Connected");
        assert_eq!(status.text(), "Connected");
        assert_eq!(status.to_string(), "Status: Connected");
    }

    #[test]
    fn controls_toggle_with_connection() {
        assert_eq!(Controls::default().enabled(), vec!["connect"]);
        assert_eq!(
            Controls::connected().enabled(),
            vec!["disconnect", "sub", "unsub", "pub"]
        );
    }
}
