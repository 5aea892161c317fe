use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use gavel_shared::constants::MAX_FRAME_SIZE;
use gavel_shared::protocol::LiveEvent;
use gavel_shared::types::ConnectionState;
use gavel_shared::ProtocolError;

use crate::connection::ConnectionNotification;

/// Decode a MESSAGE body received on `destination`, checking it belongs to
/// the subscribed topic.
pub fn decode_event(
    expected: &str,
    destination: &str,
    body: &str,
) -> Result<LiveEvent, ProtocolError> {
    if destination != expected {
        return Err(ProtocolError::UnexpectedDestination(destination.to_string()));
    }
    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::TooLarge {
            size: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    LiveEvent::from_json(body)
}

/// Checks if a notification is a message on the given topic, and decodes it
/// if so. Decode failures are logged and yield `None`.
pub fn try_decode_notification(
    notification: &ConnectionNotification,
    expected: &str,
) -> Option<LiveEvent> {
    match notification {
        ConnectionNotification::Message { destination, body } => {
            match decode_event(expected, destination, body) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(
                        destination = %destination,
                        error = %e,
                        "Dropping undecodable live event"
                    );
                    None
                }
            }
        }
        _ => None,
    }
}

/// Relay loop between one connection worker and a view inbox.
///
/// Tracks connection state on `state` and forwards every decoded event into
/// `inbox`. Ends when the worker's notification channel closes or the inbox
/// is dropped.
pub async fn relay_events<T>(
    expected: String,
    mut notif_rx: mpsc::Receiver<ConnectionNotification>,
    inbox: mpsc::Sender<T>,
    state: watch::Sender<ConnectionState>,
) where
    T: From<LiveEvent> + Send + 'static,
{
    while let Some(notification) = notif_rx.recv().await {
        match notification {
            ConnectionNotification::Connected => {
                state.send_replace(ConnectionState::Connected);
            }
            ConnectionNotification::Disconnected { .. } => {
                state.send_replace(ConnectionState::Disconnected);
            }
            ref message @ ConnectionNotification::Message { .. } => {
                let Some(event) = try_decode_notification(message, &expected) else {
                    continue;
                };
                debug!(destination = %expected, kind = event.kind(), "Live event received");
                if inbox.send(T::from(event)).await.is_err() {
                    debug!(destination = %expected, "Inbox closed, stopping relay");
                    break;
                }
            }
        }
    }
}
