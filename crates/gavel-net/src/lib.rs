// Live-update transport: STOMP over WebSocket with one connection per mounted view.

pub mod connection;
pub mod manager;
pub mod stomp;
pub mod subscription;
pub mod topic;

pub use connection::{
    spawn_connection, ConnectRequest, ConnectionCommand, ConnectionNotification, LiveConfig,
};
pub use manager::{ConnectionManager, MountRequest};
pub use stomp::{Command, Frame, Heartbeat, StompError};
pub use subscription::{decode_event, relay_events, try_decode_notification};
pub use topic::LiveTopic;
