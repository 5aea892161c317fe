use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::model::{Bid, ChatMessage, Comment, OrderStatus};
use crate::types::{CommentId, OrderId};

/// Push events delivered over the message bus.
///
/// Every payload is a JSON object tagged with `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveEvent {
    /// A comment (root or reply) was posted.
    NewComment { comment: Comment },

    /// A comment and its whole subtree were removed.
    #[serde(rename_all = "camelCase")]
    DeleteComment { comment_id: CommentId },

    /// A bid was accepted. Summary fields are server-computed.
    #[serde(rename_all = "camelCase")]
    NewBid {
        bid: Bid,
        current_price: i64,
        highest_bidder: String,
        /// Authoritative bid count, when the server includes it.
        #[serde(default)]
        bid_count: Option<u64>,
    },

    /// An order moved through its lifecycle.
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged { order_id: OrderId, status: OrderStatus },

    /// A chat line was posted on an order.
    ChatMessage { message: ChatMessage },
}

impl LiveEvent {
    /// Decode a message body.
    pub fn from_json(body: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(body).map_err(ProtocolError::from)
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewComment { .. } => "NEW_COMMENT",
            Self::DeleteComment { .. } => "DELETE_COMMENT",
            Self::NewBid { .. } => "NEW_BID",
            Self::OrderStatusChanged { .. } => "ORDER_STATUS_CHANGED",
            Self::ChatMessage { .. } => "CHAT_MESSAGE",
        }
    }
}

/// Standard REST response envelope.
///
/// Successful calls carry `data`; failures carry `error` and optionally
/// field-level `details`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status: u16,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    /// Best human-readable reason for a failed call.
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("request failed with status {}", self.status))
    }
}

/// Paginated list payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        !self.last
    }
}
