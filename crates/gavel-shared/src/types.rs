use serde::{Deserialize, Serialize};

// Server-assigned identifiers are positive 64-bit integers on the wire.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Whether the id can refer to a real server resource.
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Marketplace user.
    UserId
);
numeric_id!(
    /// Listed product (auction item).
    ProductId
);
numeric_id!(
    /// Order created when an auction closes.
    OrderId
);
numeric_id!(CommentId);
numeric_id!(BidId);
numeric_id!(ChatMessageId);

/// How the current viewer relates to a product page.
///
/// The seller receives comment events with unmasked author identities on a
/// separate topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewerRole {
    Public,
    Seller,
}

impl ViewerRole {
    pub fn for_viewer(viewer: Option<UserId>, seller: UserId) -> Self {
        match viewer {
            Some(id) if id == seller => Self::Seller,
            _ => Self::Public,
        }
    }
}

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
}

/// Observable state of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Inputs did not allow a connection (disabled, bad id, missing token).
    Disabled,
    /// Transport is being (re)established.
    Connecting,
    /// STOMP session is up and the topic is subscribed.
    Connected,
    /// Transport dropped; a reconnect is scheduled.
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
