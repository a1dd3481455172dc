use color_eyre::Result;
use mqtt_console::config::AppConfig;
use mqtt_console::mqtt::{ChannelCallback, MqttService};
use mqtt_console::ui::MqttConsole;
use std::sync::Arc;
use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Events buffered while the console waits on input
const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Konfiguration laden, fehlende Datei -> Defaults
    if std::env::args().any(|arg| arg == "--init-config") {
        AppConfig::ensure_default_config(&AppConfig::path()).await?;
    }
    let config = AppConfig::load().await?;
    info!(
        "Using broker {} as client {}",
        config.mqtt.broker_url, config.mqtt.client_id
    );

    // Service und Event-Kanal fuer die Konsole
    let service = Arc::new(MqttService::new(config.mqtt));
    let (callback, events) = ChannelCallback::channel(EVENT_BUFFER);
    service.set_callback(Arc::new(callback));

    let mut console = MqttConsole::new(service, events);
    console.run(BufReader::new(stdin()), stdout()).await?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    // stderr, damit die Konsolenausgabe sauber bleibt
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
