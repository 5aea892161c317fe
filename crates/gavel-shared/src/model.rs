//! Domain records exchanged with the marketplace backend.
//!
//! Field names follow the backend's camelCase JSON. Timestamps are the
//! backend's zone-less local date-times.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{BidId, ChatMessageId, CommentId, OrderId, ProductId, UserId, UserRole};

/// Authenticated account as returned by `/auth/*` and `/users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub nickname: String,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A node of a product's comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    /// `None` for a root comment.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub created_at: NaiveDateTime,
    /// Author label, masked (`ab***@…`) unless the viewer may see it.
    pub author_display: String,
    /// Set when `author_display` carries the unmasked identity.
    #[serde(default)]
    pub identity_revealed: bool,
    /// Children, newest first.
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Whether `self` is a more personalised rendering of the same comment
    /// than `other`.
    pub fn is_richer_than(&self, other: &Comment) -> bool {
        self.identity_revealed && !other.identity_revealed
    }
}

/// A single bid on a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: BidId,
    pub product_id: ProductId,
    pub bidder_id: UserId,
    pub bid_amount: i64,
    /// Only present for the bid's owner or the product's seller.
    #[serde(default)]
    pub max_bid_amount: Option<i64>,
    #[serde(default)]
    pub is_highest_bidder: bool,
    pub created_at: NaiveDateTime,
}

/// Product page data the live layer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub seller_id: UserId,
    pub starting_price: i64,
    pub current_price: i64,
    #[serde(default)]
    pub bid_count: u64,
    #[serde(default)]
    pub highest_bidder: Option<String>,
    pub ends_at: NaiveDateTime,
}

impl Product {
    pub fn summary(&self) -> BidSummary {
        BidSummary {
            current_price: self.current_price,
            bid_count: self.bid_count,
            highest_bidder: self.highest_bidder.clone(),
        }
    }
}

/// Price summary shown next to the bid list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidSummary {
    pub current_price: i64,
    pub bid_count: u64,
    pub highest_bidder: Option<String>,
}

/// Order lifecycle.
///
/// `PENDING_PAYMENT -> PAID -> SHIPPED -> COMPLETED`, with `CANCELLED`
/// reachable only from `PENDING_PAYMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

/// Outcome of offering a status to an order currently in some other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// Same status again.
    Repeat,
    /// Forward progress along the lifecycle.
    Forward,
    /// Backward, or out of a terminal status.
    Rejected,
}

impl OrderStatus {
    fn rank(self) -> u8 {
        match self {
            Self::PendingPayment => 0,
            Self::Paid => 1,
            Self::Shipped => 2,
            Self::Completed => 3,
            Self::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Classify a move from `self` to `next`.
    pub fn transition_to(self, next: OrderStatus) -> StatusTransition {
        if self == next {
            return StatusTransition::Repeat;
        }
        if self.is_terminal() {
            return StatusTransition::Rejected;
        }
        match next {
            Self::Cancelled if self == Self::PendingPayment => StatusTransition::Forward,
            Self::Cancelled => StatusTransition::Rejected,
            _ if next.rank() > self.rank() => StatusTransition::Forward,
            _ => StatusTransition::Rejected,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: OrderStatus,
    pub final_price: i64,
    pub created_at: NaiveDateTime,
}

/// Buyer/seller chat line attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub sender_id: UserId,
    pub message: String,
    pub created_at: NaiveDateTime,
}
