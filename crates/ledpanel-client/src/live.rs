//! Live sync over the device WebSocket.
//!
//! A background task keeps one connection open, reconnecting with an
//! exponential backoff, and forwards everything it receives as
//! [`LiveEvent`]s. Local writes are echoed to the device through an
//! [`EchoSender`] while the socket is up; echoes queued while disconnected
//! are dropped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use ledpanel_core::PanelSettings;
use ledpanel_protocol::{
    decode_device_message, encode_echo, is_field_update, DeviceMessage, SetCommand,
};

use crate::error::ClientError;

type DeviceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ECHO_QUEUE: usize = 64;
const BACKOFF_FACTOR: f64 = 1.5;

/// Events produced by the live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The socket connected.
    Opened,
    /// The socket closed or failed after being open.
    Closed,
    /// A decoded message from the device.
    Message(DeviceMessage),
    /// A text frame that was not valid JSON.
    Malformed(String),
}

/// Connection parameters for the live task.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub url: String,
    /// Requested subprotocol, none when empty.
    pub protocol: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl LiveConfig {
    pub fn from_settings(settings: &PanelSettings) -> Self {
        Self {
            url: settings.ws_url(),
            protocol: settings.ws_protocol.clone(),
            initial_backoff: settings.reconnect_interval(),
            max_backoff: settings.max_reconnect_interval(),
        }
    }
}

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial.min(max),
        }
    }

    /// Delay before the next attempt; grows by 1.5x up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(BACKOFF_FACTOR).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial.min(self.max);
    }
}

/// Best-effort sender of write echoes.
#[derive(Debug, Clone)]
pub struct EchoSender {
    tx: mpsc::Sender<String>,
}

impl EchoSender {
    /// Queue the `{"name": value}` echo. Returns false when it was dropped.
    pub fn send(&self, cmd: &SetCommand) -> bool {
        let text = match encode_echo(cmd) {
            Ok(text) => text,
            Err(e) => {
                warn!(name = %cmd.name, error = %e, "Failed to encode echo");
                return false;
            }
        };
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(e) => {
                debug!(name = %cmd.name, "Echo dropped: {}", e);
                false
            }
        }
    }
}

/// Handle to the running live task.
#[derive(Debug)]
pub struct LiveHandle {
    echo: EchoSender,
    task: JoinHandle<()>,
}

impl LiveHandle {
    pub fn echo_sender(&self) -> EchoSender {
        self.echo.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the live task. Events go to `events` until its receiver is dropped.
pub fn spawn(config: LiveConfig, events: mpsc::Sender<LiveEvent>) -> LiveHandle {
    let (tx, rx) = mpsc::channel(ECHO_QUEUE);
    let task = tokio::spawn(run(config, events, rx));
    LiveHandle {
        echo: EchoSender { tx },
        task,
    }
}

enum Flow {
    Reconnect,
    Stop,
}

async fn run(
    config: LiveConfig,
    events: mpsc::Sender<LiveEvent>,
    mut echoes: mpsc::Receiver<String>,
) {
    let mut backoff = Backoff::new(config.initial_backoff, config.max_backoff);

    loop {
        match connect(&config).await {
            Ok(ws) => {
                backoff.reset();
                info!(url = %config.url, "WebSocket connected");

                // Echoes from before the connection are stale
                while echoes.try_recv().is_ok() {}

                if events.send(LiveEvent::Opened).await.is_err() {
                    return;
                }

                let flow = match pump(ws, &events, &mut echoes).await {
                    Ok(flow) => flow,
                    Err(e) => {
                        warn!(error = %e, "WebSocket connection lost");
                        Flow::Reconnect
                    }
                };
                if matches!(flow, Flow::Stop) || events.send(LiveEvent::Closed).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!(url = %config.url, error = %e, "WebSocket connect failed");
            }
        }

        let delay = backoff.next_delay();
        debug!(?delay, "Reconnecting");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                echo = echoes.recv() => match echo {
                    Some(text) => debug!(%text, "Not connected, dropping echo"),
                    None => return,
                },
            }
        }
    }
}

async fn connect(config: &LiveConfig) -> Result<DeviceSocket, ClientError> {
    let mut request = config.url.as_str().into_client_request()?;
    if !config.protocol.is_empty() {
        let value = HeaderValue::from_str(&config.protocol)
            .map_err(|_| ClientError::InvalidProtocol(config.protocol.clone()))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }

    let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(ws)
}

async fn pump(
    ws: DeviceSocket,
    events: &mpsc::Sender<LiveEvent>,
    echoes: &mut mpsc::Receiver<String>,
) -> Result<Flow, ClientError> {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => match decode_device_message(&text) {
                        Ok(msg) => {
                            // client info and keepalive traffic is frequent
                            if is_field_update(&text) {
                                debug!(%text, "Field update");
                            } else {
                                trace!(%text, "Device message");
                            }
                            LiveEvent::Message(msg)
                        }
                        Err(e) => {
                            warn!(error = %e, %text, "Dropping malformed message");
                            LiveEvent::Malformed(text)
                        }
                    },
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite queues the pong, flushing sends it
                        ws_tx.flush().await?;
                        continue;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(len = data.len(), "Ignoring binary frame");
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "WebSocket closed by device");
                        return Ok(Flow::Reconnect);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(Flow::Reconnect),
                };
                if events.send(event).await.is_err() {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(Flow::Stop);
                }
            }
            echo = echoes.recv() => match echo {
                Some(text) => {
                    debug!(%text, "Sending echo");
                    ws_tx.send(Message::Text(text)).await?;
                }
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(Flow::Stop);
                }
            },
        }
    }
}
