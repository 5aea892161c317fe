//! Merging inbound events into view state.
//!
//! Every change to a live view arrives as a [`ViewInput`]: remote events
//! decoded off the bus, and the results of this client's own writes. Both go
//! through the same inbox, so a view sees them in one total order.

pub mod bids;
pub mod chat;
pub mod comments;
pub mod echo;
pub mod order;

pub use bids::BidBoard;
pub use chat::{ChatEntry, ChatLog};
pub use comments::CommentThread;
pub use echo::EchoSuppressor;
pub use order::OrderTracker;

use gavel_shared::{ChatMessage, Comment, CommentId, LiveEvent, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewInput {
    /// Event received from the message bus.
    Remote(LiveEvent),
    /// Comment this client just posted.
    LocalComment(Comment),
    /// Comment this client just deleted.
    LocalCommentDeleted(CommentId),
    /// Chat line this client just sent.
    LocalChat(ChatMessage),
    /// Signed-in user changed.
    Viewer(Option<UserId>),
}

impl From<LiveEvent> for ViewInput {
    fn from(event: LiveEvent) -> Self {
        Self::Remote(event)
    }
}

impl ViewInput {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Remote(event) => event.kind(),
            Self::LocalComment(_) => "LOCAL_COMMENT",
            Self::LocalCommentDeleted(_) => "LOCAL_COMMENT_DELETED",
            Self::LocalChat(_) => "LOCAL_CHAT",
            Self::Viewer(_) => "VIEWER",
        }
    }
}

/// What applying one input did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Replaced,
    Removed,
    Appended,
    Advanced,
    /// Left the view as it was, with the reason.
    Ignored(&'static str),
}

impl Outcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

/// State that can absorb [`ViewInput`]s.
pub trait Reconcile: Send + Sync + 'static {
    fn apply(&mut self, input: ViewInput) -> Outcome;
}
