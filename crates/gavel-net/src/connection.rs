//! Live connection worker.
//!
//! Each connection runs in its own tokio task. It owns the WebSocket, speaks
//! STOMP, keeps one subscription alive across reconnects and reports what it
//! sees through a notification channel. Transport failures never leave this
//! module: they become `Disconnected` notifications followed by a reconnect.

use std::time::Duration;

use anyhow::{bail, Context};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use gavel_shared::constants::{
    DEFAULT_HEARTBEAT_MS, DEFAULT_INBOX_CAPACITY, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_WS_URL,
    MAX_FRAME_SIZE,
};

use crate::stomp::{Command, Frame, Heartbeat};

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the connection task.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Unsubscribe, send DISCONNECT and stop reconnecting.
    Shutdown,
}

/// Notifications sent *from* the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotification {
    /// STOMP session established and the topic subscribed.
    Connected,
    /// Transport dropped; a reconnect is scheduled.
    Disconnected { reason: String },
    /// A MESSAGE frame arrived.
    Message { destination: String, body: String },
}

/// Transport settings shared by every live connection.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// STOMP-over-WebSocket endpoint, e.g. `ws://localhost:8080/ws`.
    pub url: String,
    /// Fixed delay before reconnecting after a drop.
    pub reconnect_delay: Duration,
    /// Heartbeat offered in both directions.
    pub heartbeat: Duration,
    /// Capacity of the notification channel.
    pub channel_capacity: usize,
    /// How long to wait for the broker's CONNECTED frame.
    pub connect_timeout: Duration,
    /// How long a shutdown may take before the task is aborted.
    pub shutdown_grace: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            heartbeat: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            channel_capacity: DEFAULT_INBOX_CAPACITY,
            connect_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

/// What a single connection subscribes to and how it authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub destination: String,
    pub token: Option<String>,
}

enum SessionEnd {
    Shutdown,
    Dropped(String),
}

/// Spawn a connection worker in a background tokio task.
///
/// Returns the command sender, the notification receiver and the task
/// handle. The worker stops on [`ConnectionCommand::Shutdown`], when every
/// command sender is dropped, or when the notification receiver is dropped.
pub fn spawn_connection(
    config: LiveConfig,
    request: ConnectRequest,
) -> (
    mpsc::Sender<ConnectionCommand>,
    mpsc::Receiver<ConnectionNotification>,
    JoinHandle<()>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ConnectionCommand>(8);
    let (notif_tx, notif_rx) = mpsc::channel::<ConnectionNotification>(config.channel_capacity);

    let handle = tokio::spawn(async move {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            debug!(
                destination = %request.destination,
                attempt,
                "Opening live connection"
            );

            let reason = match run_session(&config, &request, &mut cmd_rx, &notif_tx).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Dropped(reason)) => reason,
                Err(e) => format!("{e:#}"),
            };

            warn!(
                destination = %request.destination,
                reason = %reason,
                delay_ms = config.reconnect_delay.as_millis() as u64,
                "Live connection dropped, reconnecting"
            );
            if notif_tx
                .send(ConnectionNotification::Disconnected { reason })
                .await
                .is_err()
            {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(config.reconnect_delay) => {}
                _ = cmd_rx.recv() => {
                    // Shutdown, or every sender dropped.
                    break;
                }
            }
        }

        info!(destination = %request.destination, "Live connection worker terminated");
    });

    (cmd_tx, notif_rx, handle)
}

/// One transport session: handshake, subscribe, pump frames until the
/// connection drops or a shutdown is requested.
async fn run_session(
    config: &LiveConfig,
    request: &ConnectRequest,
    cmd_rx: &mut mpsc::Receiver<ConnectionCommand>,
    notif_tx: &mpsc::Sender<ConnectionNotification>,
) -> anyhow::Result<SessionEnd> {
    let (ws, _) = tokio::select! {
        res = tokio_tungstenite::connect_async(config.url.as_str()) => {
            res.context("WebSocket handshake failed")?
        }
        _ = cmd_rx.recv() => return Ok(SessionEnd::Shutdown),
    };
    let (mut sink, mut stream) = ws.split();

    let offered = Heartbeat::symmetric(config.heartbeat);
    let connect = Frame::connect(host_of(&config.url), request.token.as_deref(), offered);
    sink.send(Message::Text(connect.encode()))
        .await
        .context("Failed to send CONNECT")?;

    let connected = tokio::select! {
        frame = next_frame(&mut stream) => frame?,
        _ = cmd_rx.recv() => {
            let _ = sink.close().await;
            return Ok(SessionEnd::Shutdown);
        }
        _ = tokio::time::sleep(config.connect_timeout) => bail!("Timed out waiting for CONNECTED"),
    };

    match connected.command {
        Command::Connected => {}
        Command::Error => bail!(
            "Broker rejected connection: {}",
            connected.header("message").unwrap_or("no reason given")
        ),
        other => bail!("Expected CONNECTED, got {other}"),
    }

    let server_hb = match connected.header("heart-beat") {
        Some(value) => Heartbeat::parse(value).context("Bad heart-beat from broker")?,
        None => Heartbeat::default(),
    };
    let hb = Heartbeat::negotiate(offered, server_hb);

    let subscription_id = format!("sub-{}", uuid::Uuid::new_v4());
    sink.send(Message::Text(
        Frame::subscribe(&subscription_id, &request.destination).encode(),
    ))
    .await
    .context("Failed to send SUBSCRIBE")?;

    info!(
        destination = %request.destination,
        subscription = %subscription_id,
        heartbeat_out_ms = hb.outgoing.as_millis() as u64,
        heartbeat_in_ms = hb.incoming.as_millis() as u64,
        "Live connection established"
    );
    if notif_tx.send(ConnectionNotification::Connected).await.is_err() {
        return Ok(SessionEnd::Shutdown);
    }

    let mut keepalive = (!hb.outgoing.is_zero()).then(|| {
        let mut iv = tokio::time::interval(hb.outgoing);
        iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
        iv
    });
    // Tolerate one late heartbeat before declaring the link dead.
    let silence_limit = (!hb.incoming.is_zero()).then(|| hb.incoming * 2);
    let mut last_seen = Instant::now();

    loop {
        let deadline = silence_limit.map(|limit| last_seen + limit);

        tokio::select! {
            _ = cmd_rx.recv() => {
                let _ = sink
                    .send(Message::Text(Frame::unsubscribe(&subscription_id).encode()))
                    .await;
                let _ = sink.send(Message::Text(Frame::disconnect().encode())).await;
                let _ = sink.close().await;
                return Ok(SessionEnd::Shutdown);
            }

            msg = stream.next() => {
                let text = match msg {
                    None => return Ok(SessionEnd::Dropped("stream ended".to_string())),
                    Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("Dropping non UTF-8 binary frame");
                            last_seen = Instant::now();
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by broker".to_string());
                        return Ok(SessionEnd::Dropped(reason));
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong: tungstenite answers pings itself.
                        last_seen = Instant::now();
                        continue;
                    }
                };
                last_seen = Instant::now();

                if text.len() > MAX_FRAME_SIZE {
                    warn!(len = text.len(), max = MAX_FRAME_SIZE, "Dropping oversized frame");
                    continue;
                }

                let frame = match Frame::decode(&text) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable STOMP frame");
                        continue;
                    }
                };

                match frame.command {
                    Command::Message => {
                        let destination = frame
                            .header("destination")
                            .unwrap_or_default()
                            .to_string();
                        let notification = ConnectionNotification::Message {
                            destination,
                            body: frame.body,
                        };
                        if notif_tx.send(notification).await.is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Command::Error => {
                        let reason = frame
                            .header("message")
                            .unwrap_or("broker error")
                            .to_string();
                        return Ok(SessionEnd::Dropped(reason));
                    }
                    other => debug!(command = %other, "Ignoring frame"),
                }
            }

            _ = tick(&mut keepalive) => {
                sink.send(Message::Text("\n".to_string()))
                    .await
                    .context("Failed to send heartbeat")?;
            }

            _ = expire(deadline) => {
                return Ok(SessionEnd::Dropped("heartbeat timeout".to_string()));
            }
        }
    }
}

async fn next_frame<S>(stream: &mut S) -> anyhow::Result<Frame>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        let text = match msg.context("WebSocket read failed")? {
            Message::Text(text) => text,
            Message::Close(_) => bail!("Closed during STOMP handshake"),
            _ => continue,
        };
        if let Some(frame) = Frame::decode(&text)? {
            return Ok(frame);
        }
    }
    bail!("Stream ended during STOMP handshake")
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Host part of a `ws://` / `wss://` URL, for the STOMP `host` header.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split('/').next().unwrap_or(rest);
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    if authority.starts_with('[') {
        // IPv6 literal
        return authority
            .split_once(']')
            .map(|(h, _)| h.trim_start_matches('['))
            .unwrap_or(authority);
    }
    authority.split(':').next().unwrap_or(authority)
}
