//! # MQTT Service Facade
//!
//! Thin facade over `rumqttc`. Every operation checks the connection flag,
//! delegates to the client, logs, and reports back through the registered
//! [`MqttCallback`].
//!
//! ## Event Flow
//!
//! ```text
//! connect() ─spawn─▶ drive_event_loop ─poll─▶ rumqttc::EventLoop
//!                          │
//!                          ▼
//!                  Shared::handle_event ──▶ MqttCallback (1 event → 1 call)
//! ```
//!
//! The flag is the only connection state. It is set by a successful CONNACK and
//! cleared by a failed connect, a lost connection or an explicit disconnect.
//! There is no reconnection: once the event loop reports an error the task ends
//! and the next `connect()` starts a fresh client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Incoming, Outgoing,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::callback::MqttCallback;
use super::config::MqttConfig;
use super::delivery::DeliveryTracker;
use super::error::MqttError;
use super::transport::MqttTransport;

/// Capacity of the rumqttc request channel
const REQUEST_CAPACITY: usize = 100;

/// How long `close()` waits for the DISCONNECT to be flushed
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Whether the event loop should keep polling after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventFlow {
    Continue,
    Stop,
}

/// State shared between the facade and the event-loop task
#[derive(Default)]
pub(crate) struct Shared {
    connected: AtomicBool,
    disconnecting: AtomicBool,
    callback: RwLock<Option<Arc<dyn MqttCallback>>>,
    deliveries: Mutex<DeliveryTracker>,
}

impl Shared {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn callback(&self) -> Option<Arc<dyn MqttCallback>> {
        self.callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn deliveries(&self) -> std::sync::MutexGuard<'_, DeliveryTracker> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        self.disconnecting.store(false, Ordering::SeqCst);
        self.deliveries().clear();
    }

    fn notify_failure(&self, reason: &str) {
        if let Some(callback) = self.callback() {
            callback.on_connection_failure(reason);
        }
    }

    /// Translates one rumqttc event into at most one callback.
    pub(crate) fn handle_event(&self, event: &Event) -> EventFlow {
        match event {
            Event::Incoming(Incoming::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    self.connected.store(true, Ordering::SeqCst);
                    info!("MQTT connected (session present: {})", ack.session_present);
                    if let Some(callback) = self.callback() {
                        callback.on_connection_success();
                    }
                    EventFlow::Continue
                } else {
                    // rumqttc reports refusals as poll errors, see poll_error
                    self.connection_failed(MqttError::Refused(ack.code).to_string());
                    EventFlow::Stop
                }
            }
            Event::Incoming(Incoming::Publish(publish)) => {
                let payload = String::from_utf8_lossy(&publish.payload);
                debug!(
                    "Message received - topic: {}, content: {}",
                    publish.topic, payload
                );
                if let Some(callback) = self.callback() {
                    callback.on_message_received(&publish.topic, &payload);
                }
                EventFlow::Continue
            }
            Event::Incoming(Incoming::PubAck(ack)) => {
                let topic = self.deliveries().on_acknowledged(ack.pkid);
                self.delivered(topic);
                EventFlow::Continue
            }
            Event::Incoming(Incoming::PubComp(comp)) => {
                let topic = self.deliveries().on_acknowledged(comp.pkid);
                self.delivered(topic);
                EventFlow::Continue
            }
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                let topic = self.deliveries().on_sent(*pkid);
                self.delivered(topic);
                EventFlow::Continue
            }
            Event::Outgoing(Outgoing::Disconnect) => {
                debug!("DISCONNECT flushed, stopping event loop");
                self.connected.store(false, Ordering::SeqCst);
                EventFlow::Stop
            }
            _ => EventFlow::Continue,
        }
    }

    fn delivered(&self, topic: Option<String>) {
        if let Some(topic) = topic {
            debug!("Message delivered - topic: {}", topic);
            if let Some(callback) = self.callback() {
                callback.on_message_delivered(&topic);
            }
        }
    }

    /// Clears the flag and reports the failure, unless a disconnect was requested.
    pub(crate) fn connection_failed(&self, reason: String) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        self.deliveries().clear();

        if self.disconnecting.load(Ordering::SeqCst) {
            debug!("Connection closed after disconnect: {}", reason);
            return;
        }

        let reason = if was_connected {
            format!("Connection lost: {}", reason)
        } else {
            reason
        };
        error!("MQTT connection failed: {}", reason);
        self.notify_failure(&reason);
    }
}

/// Maps an event-loop error to the facade's error.
///
/// rumqttc returns a refused CONNACK and a missed connect deadline as poll
/// errors, never as events.
fn poll_error(error: ConnectionError, established: bool, connect_timeout: u64) -> MqttError {
    match error {
        ConnectionError::ConnectionRefused(code) => MqttError::Refused(code),
        ConnectionError::NetworkTimeout if !established => MqttError::Timeout(connect_timeout),
        other => MqttError::from(other),
    }
}

/// Polls the rumqttc event loop until the connection ends.
///
/// The connect deadline is rumqttc's own network timeout, set from
/// `connection_timeout` before the task is spawned.
pub(crate) async fn drive_event_loop(
    shared: Arc<Shared>,
    mut eventloop: EventLoop,
    token: CancellationToken,
) {
    let connect_timeout = eventloop.network_options.connection_timeout();
    let mut established = false;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Event loop cancelled");
                break;
            }
            polled = eventloop.poll() => match polled {
                Ok(event) => {
                    if shared.handle_event(&event) == EventFlow::Stop {
                        break;
                    }
                    established |= shared.is_connected();
                }
                Err(e) => {
                    shared.connection_failed(poll_error(e, established, connect_timeout).to_string());
                    break;
                }
            }
        }
    }

    shared.connected.store(false, Ordering::SeqCst);
    debug!("Event loop task finished");
}

struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Facade over the rumqttc client.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct MqttService {
    config: MqttConfig,
    shared: Arc<Shared>,
    transport: Mutex<Option<Arc<dyn MqttTransport>>>,
    session: Mutex<Option<Session>>,
    // keeps queue order identical to request order
    publish_lock: tokio::sync::Mutex<()>,
}

impl MqttService {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            transport: Mutex::new(None),
            session: Mutex::new(None),
            publish_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Registers the listener, replacing any previous one.
    pub fn set_callback(&self, callback: Arc<dyn MqttCallback>) {
        *self
            .shared
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn transport(&self) -> Option<Arc<dyn MqttTransport>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn connected_transport(&self) -> Option<Arc<dyn MqttTransport>> {
        if self.is_connected() {
            self.transport()
        } else {
            None
        }
    }

    /// True while a connection attempt is under way but not yet acknowledged.
    pub fn is_connecting(&self) -> bool {
        !self.is_connected() && self.session_running()
    }

    fn session_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Starts a connection attempt.
    ///
    /// Returns once the attempt is under way; the outcome arrives through the
    /// callback. Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<(), MqttError> {
        if self.is_connected() {
            debug!("Already connected, ignoring connect");
            return Ok(());
        }
        if self.session_running() {
            info!("Connection attempt already in progress");
            return Ok(());
        }

        let options = match self.config.mqtt_options() {
            Ok(options) => options,
            Err(e) => {
                let e = MqttError::from(e);
                error!("MQTT connect failed: {}", e);
                self.shared.notify_failure(&e.to_string());
                return Err(e);
            }
        };

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        // covers TCP connect plus CONNACK, rumqttc defaults to 5s
        eventloop
            .network_options
            .set_connection_timeout(self.config.connection_timeout);
        self.shared.reset();
        *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(client));

        let token = CancellationToken::new();
        let handle = tokio::spawn(drive_event_loop(
            self.shared.clone(),
            eventloop,
            token.clone(),
        ));
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Session { token, handle });

        info!("Connecting to MQTT broker {}", self.config.broker_url);
        Ok(())
    }

    /// Sends DISCONNECT and clears the flag. No callback is emitted.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        let Some(transport) = self.connected_transport() else {
            debug!("Not connected, ignoring disconnect");
            return Ok(());
        };

        self.shared.disconnecting.store(true, Ordering::SeqCst);
        match transport.disconnect().await {
            Ok(()) => {
                self.shared.connected.store(false, Ordering::SeqCst);
                info!("MQTT disconnected");
                Ok(())
            }
            Err(e) => {
                self.shared.disconnecting.store(false, Ordering::SeqCst);
                error!("MQTT disconnect failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        let Some(transport) = self.connected_transport() else {
            debug!("Not connected, ignoring subscribe to {}", topic);
            return Ok(());
        };
        let qos = self.config.qos()?;

        if let Err(e) = transport.subscribe(topic.to_string(), qos).await {
            error!("Subscribe to {} failed: {}", topic, e);
            return Err(e);
        }
        info!("Subscribed to topic: {}", topic);
        Ok(())
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<(), MqttError> {
        let Some(transport) = self.connected_transport() else {
            debug!("Not connected, ignoring unsubscribe from {}", topic);
            return Ok(());
        };

        if let Err(e) = transport.unsubscribe(topic.to_string()).await {
            error!("Unsubscribe from {} failed: {}", topic, e);
            return Err(e);
        }
        info!("Unsubscribed from topic: {}", topic);
        Ok(())
    }

    pub async fn publish(&self, topic: &str, message: &str) -> Result<(), MqttError> {
        let Some(transport) = self.connected_transport() else {
            debug!("Not connected, ignoring publish to {}", topic);
            return Ok(());
        };
        let qos = self.config.qos()?;

        let _order = self.publish_lock.lock().await;
        // queued first, the event loop may report the send before publish() returns
        self.shared.deliveries().queue(topic.to_string(), qos);

        if let Err(e) = transport
            .publish(topic.to_string(), qos, message.as_bytes().to_vec())
            .await
        {
            self.shared.deliveries().discard_last();
            error!("Publish to {} failed: {}", topic, e);
            return Err(e);
        }
        info!("Published to topic {}: {}", topic, message);
        Ok(())
    }

    /// Disconnects and stops the event-loop task.
    pub async fn close(&self) {
        let was_connected = self.is_connected();
        if let Err(e) = self.disconnect().await {
            warn!("Disconnect during close failed: {}", e);
        }
        self.shared.disconnecting.store(true, Ordering::SeqCst);

        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Session { token, mut handle }) = session {
            if !was_connected || tokio::time::timeout(CLOSE_GRACE, &mut handle).await.is_err() {
                token.cancel();
                if let Err(e) = handle.await {
                    warn!("Event loop task ended abnormally: {}", e);
                }
            }
        }

        *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.shared.connected.store(false, Ordering::SeqCst);
        info!("MQTT service closed");
    }

    #[cfg(test)]
    pub(crate) fn attach_transport(&self, transport: Arc<dyn MqttTransport>) {
        *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }
}
