//! # Console Front End
//!
//! Line-oriented stand-in for a form with buttons: every input line is one
//! button press, every service callback becomes a log line.
//!
//! ## Module Structure
//!
//! ```text
//! ui/
//! ├── mod.rs          - MqttConsole: input/event loop
//! ├── common.rs       - LogView, StatusLabel, Controls
//! └── mqtt_menu.rs    - Command parsing and handlers
//! ```
//!
//! ## Event Loop
//!
//! The console selects over two sources:
//! - input lines, parsed into [`Command`]s and handed to the [`MqttMenu`]
//! - [`ServiceEvent`]s arriving from the MQTT service through a channel
//!
//! Both are handled on the same task, so the menu state needs no locking.
//! End of input behaves like `quit`.

pub mod common;
pub mod mqtt_menu;

pub use common::{Controls, LogView, StatusLabel};
pub use mqtt_menu::{Command, CommandError, MenuFlow, MqttMenu};

use crate::mqtt::{MqttService, ServiceEvent};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const PROMPT: &str = "> ";

pub struct MqttConsole {
    service: Arc<MqttService>,
    menu: MqttMenu,
    events: mpsc::Receiver<ServiceEvent>,
}

impl MqttConsole {
    pub fn new(service: Arc<MqttService>, events: mpsc::Receiver<ServiceEvent>) -> Self {
        Self {
            menu: MqttMenu::new(service.clone()),
            service,
            events,
        }
    }

    pub fn menu(&self) -> &MqttMenu {
        &self.menu
    }

    async fn flush<W: AsyncWrite + Unpin>(&mut self, output: &mut W) -> Result<()> {
        let mut text = String::new();
        for line in self.menu.take_output() {
            text.push_str(&line);
            text.push('\n');
        }
        write_out(output, &text).await
    }

    /// Runs until `quit` or end of input, then closes the service.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Console started");
        let mut lines = input.lines();
        self.menu.handle_command(Command::Help).await;
        let status = self.menu.status().to_string();
        self.flush(&mut output).await?;
        write_out(&mut output, &format!("{}\n{}", status, PROMPT)).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = line.map_err(|e| eyre!("Failed to read input: {}", e))?;
                    let Some(line) = line else {
                        debug!("End of input");
                        break;
                    };

                    match line.parse::<Command>() {
                        Ok(command) => {
                            if self.menu.handle_command(command).await == MenuFlow::Quit {
                                self.flush(&mut output).await?;
                                break;
                            }
                        }
                        Err(CommandError::Empty) => {}
                        Err(e) => {
                            warn!("Rejected input '{}': {}", line, e);
                            write_out(&mut output, &format!("! {}\n", e)).await?;
                        }
                    }
                    self.flush(&mut output).await?;
                    write_out(&mut output, PROMPT).await?;
                }
                Some(event) = self.events.recv() => {
                    self.menu.handle_event(event);
                    self.flush(&mut output).await?;
                }
            }
        }

        self.service.close().await;
        info!("Console stopped");
        Ok(())
    }
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .await
        .map_err(|e| eyre!("Failed to write console output: {}", e))?;
    output
        .flush()
        .await
        .map_err(|e| eyre!("Failed to flush console output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::{ChannelCallback, MqttConfig};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn scripted_session_without_broker() {
        let service = Arc::new(MqttService::new(MqttConfig::default()));
        let (callback, events) = ChannelCallback::channel(16);
        service.set_callback(Arc::new(callback));
        let mut console = MqttConsole::new(service, events);

        let input = BufReader::new("sub a/b\nbogus\n\nstatus\nquit\nsub never/reached\n".as_bytes());
        let mut output = Vec::new();
        console.run(input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Commands:"));
        assert!(text.contains("Please connect to the MQTT broker first"));
        assert!(text.contains("! Unknown command 'bogus'"));
        assert!(text.contains("Status: Disconnected"));
        assert!(text.contains("Enabled: connect"));
        assert!(!text.contains("never/reached"));
        assert_eq!(console.menu().log().len(), 1);
    }

    #[tokio::test]
    async fn end_of_input_stops_the_console() {
        let service = Arc::new(MqttService::new(MqttConfig::default()));
        let (_tx, events) = mpsc::channel(1);
        let mut console = MqttConsole::new(service, events);

        let mut output = Vec::new();
        console
            .run(BufReader::new("".as_bytes()), &mut output)
            .await
            .unwrap();
        assert!(console.menu().log().is_empty());
    }
}
