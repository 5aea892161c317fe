//! Per-view connection lifecycle.
//!
//! A [`ConnectionManager`] belongs to one mounted feature (a product's
//! comment thread, an order's chat, ...). It holds at most one live
//! connection and guarantees the previous one is fully deactivated before a
//! replacement is opened.

use std::marker::PhantomData;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gavel_shared::protocol::LiveEvent;
use gavel_shared::types::ConnectionState;

use crate::connection::{spawn_connection, ConnectRequest, ConnectionCommand, LiveConfig};
use crate::subscription::relay_events;
use crate::topic::LiveTopic;

/// Inputs of one mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub topic: LiveTopic,
    pub token: Option<String>,
    pub enabled: bool,
}

impl MountRequest {
    pub fn new(topic: LiveTopic, token: Option<String>) -> Self {
        Self {
            topic,
            token,
            enabled: true,
        }
    }

    /// Why this request cannot open a connection, if it cannot.
    pub fn rejection(&self) -> Option<&'static str> {
        if !self.enabled {
            return Some("disabled");
        }
        if !self.topic.has_valid_resource() {
            return Some("missing resource id");
        }
        let has_token = self.token.as_deref().is_some_and(|t| !t.is_empty());
        if self.topic.requires_token() && !has_token {
            return Some("no access token");
        }
        None
    }
}

struct ActiveConnection {
    request: MountRequest,
    cmd_tx: mpsc::Sender<ConnectionCommand>,
    worker: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        // Dropped without a graceful shutdown: make sure nothing keeps
        // delivering into the inbox.
        self.worker.abort();
        self.relay.abort();
    }
}

/// Owns the live connection of one mounted feature.
///
/// `T` is the inbox item type of the view being fed; decoded events are
/// converted with `T::from`.
pub struct ConnectionManager<T> {
    config: LiveConfig,
    inbox: mpsc::Sender<T>,
    state_tx: watch::Sender<ConnectionState>,
    active: Option<ActiveConnection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ConnectionManager<T>
where
    T: From<LiveEvent> + Send + 'static,
{
    pub fn new(config: LiveConfig, inbox: mpsc::Sender<T>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disabled);
        Self {
            config,
            inbox,
            state_tx,
            active: None,
            _marker: PhantomData,
        }
    }

    /// Observe connection state changes (for a passive "disconnected" badge).
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Inputs of the current mount, if a connection is open.
    pub fn current(&self) -> Option<&MountRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    /// Apply new mount inputs.
    ///
    /// Unchanged inputs keep the existing connection. Otherwise the old
    /// connection is shut down and awaited first, then a new one is opened if
    /// the inputs allow it.
    pub async fn mount(&mut self, request: MountRequest) -> ConnectionState {
        if self.current() == Some(&request) {
            return self.state();
        }

        self.deactivate().await;

        if let Some(reason) = request.rejection() {
            debug!(topic = %request.topic, reason, "Live connection not opened");
            self.state_tx.send_replace(ConnectionState::Disabled);
            return ConnectionState::Disabled;
        }

        let destination = request.topic.destination();
        let (cmd_tx, notif_rx, worker) = spawn_connection(
            self.config.clone(),
            ConnectRequest {
                destination: destination.clone(),
                token: request.token.clone(),
            },
        );

        self.state_tx.send_replace(ConnectionState::Connecting);
        let relay = tokio::spawn(relay_events(
            destination.clone(),
            notif_rx,
            self.inbox.clone(),
            self.state_tx.clone(),
        ));

        info!(destination = %destination, "Live connection mounted");
        self.active = Some(ActiveConnection {
            request,
            cmd_tx,
            worker,
            relay,
        });

        ConnectionState::Connecting
    }

    /// Tear down the current connection, if any.
    pub async fn unmount(&mut self) {
        self.deactivate().await;
        self.state_tx.send_replace(ConnectionState::Disabled);
    }

    async fn deactivate(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let destination = active.request.topic.destination();
        let grace = self.config.shutdown_grace;

        let _ = active.cmd_tx.send(ConnectionCommand::Shutdown).await;
        if tokio::time::timeout(grace, &mut active.worker).await.is_err() {
            warn!(destination = %destination, "Live connection did not stop in time, aborting");
            active.worker.abort();
        }
        // The relay ends once the worker's notification sender is gone.
        if tokio::time::timeout(grace, &mut active.relay).await.is_err() {
            active.relay.abort();
        }

        info!(destination = %destination, "Live connection unmounted");
    }
}
