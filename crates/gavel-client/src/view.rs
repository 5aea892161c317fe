//! Live view state for the product and order pages.

use gavel_shared::{
    Bid, BidSummary, ChatMessage, Comment, LiveEvent, Order, OrderId, ProductId, UserId,
};

use crate::reconcile::{
    BidBoard, ChatLog, CommentThread, Outcome, OrderTracker, Reconcile, ViewInput,
};

/// Comment thread and bid board of one product.
#[derive(Debug, Clone)]
pub struct ProductLiveView {
    pub product: ProductId,
    pub thread: CommentThread,
    pub board: BidBoard,
}

impl ProductLiveView {
    pub fn new(
        product: ProductId,
        comments: Vec<Comment>,
        bids: Vec<Bid>,
        summary: BidSummary,
        echo_capacity: usize,
    ) -> Self {
        Self {
            product,
            thread: CommentThread::new(comments, echo_capacity),
            board: BidBoard::new(bids, summary),
        }
    }
}

impl Reconcile for ProductLiveView {
    fn apply(&mut self, input: ViewInput) -> Outcome {
        match input {
            ViewInput::Remote(LiveEvent::NewComment { comment }) => self.thread.apply_insert(comment),
            ViewInput::LocalComment(comment) => self.thread.record_local(comment),
            ViewInput::Remote(LiveEvent::DeleteComment { comment_id })
            | ViewInput::LocalCommentDeleted(comment_id) => self.thread.apply_delete(comment_id),
            ViewInput::Remote(LiveEvent::NewBid {
                bid,
                current_price,
                highest_bidder,
                bid_count,
            }) => {
                if bid.product_id != self.product {
                    return Outcome::Ignored("bid for another product");
                }
                self.board
                    .apply_bid(bid, current_price, highest_bidder, bid_count)
            }
            _ => Outcome::Ignored("not a product event"),
        }
    }
}

/// Status and chat of one order.
#[derive(Debug, Clone)]
pub struct OrderLiveView {
    pub order: Order,
    pub tracker: OrderTracker,
    pub chat: ChatLog,
}

impl OrderLiveView {
    pub fn new(order: Order, viewer: Option<UserId>, history: Vec<ChatMessage>) -> Self {
        Self {
            tracker: OrderTracker::new(order.id, order.status),
            chat: ChatLog::new(viewer, history),
            order,
        }
    }

    pub fn id(&self) -> OrderId {
        self.order.id
    }
}

impl Reconcile for OrderLiveView {
    fn apply(&mut self, input: ViewInput) -> Outcome {
        match input {
            ViewInput::Remote(LiveEvent::OrderStatusChanged { order_id, status }) => {
                let outcome = self.tracker.apply_status(order_id, status);
                if outcome.changed() {
                    self.order.status = self.tracker.status();
                }
                outcome
            }
            ViewInput::Remote(LiveEvent::ChatMessage { message }) | ViewInput::LocalChat(message) => {
                self.chat.apply_message(message)
            }
            ViewInput::Viewer(viewer) => {
                if self.chat.set_viewer(viewer) {
                    Outcome::Replaced
                } else {
                    Outcome::Ignored("same viewer")
                }
            }
            _ => Outcome::Ignored("not an order event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use gavel_shared::{BidId, ChatMessageId, CommentId, OrderStatus};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    fn product_view() -> ProductLiveView {
        ProductLiveView::new(
            ProductId(1),
            Vec::new(),
            Vec::new(),
            BidSummary {
                current_price: 100,
                bid_count: 3,
                highest_bidder: None,
            },
            16,
        )
    }

    fn bid_event(product: i64) -> LiveEvent {
        LiveEvent::NewBid {
            bid: Bid {
                id: BidId(1),
                product_id: ProductId(product),
                bidder_id: UserId(8),
                bid_amount: 120,
                max_bid_amount: None,
                is_highest_bidder: true,
                created_at: at(),
            },
            current_price: 120,
            highest_bidder: "A".to_string(),
            bid_count: None,
        }
    }

    #[test]
    fn test_product_view_routes_events() {
        let mut view = product_view();

        let comment = Comment {
            id: CommentId(5),
            parent_id: None,
            content: "Still available?".to_string(),
            created_at: at(),
            author_display: "jo***".to_string(),
            identity_revealed: false,
            replies: Vec::new(),
        };
        assert_eq!(
            view.apply(LiveEvent::NewComment { comment }.into()),
            Outcome::Inserted
        );
        assert_eq!(view.apply(bid_event(1).into()), Outcome::Appended);
        assert_eq!(view.board.summary().bid_count, 4);

        assert!(!view.apply(bid_event(2).into()).changed());
        assert!(!view
            .apply(
                LiveEvent::OrderStatusChanged {
                    order_id: OrderId(1),
                    status: OrderStatus::Paid,
                }
                .into()
            )
            .changed());

        assert_eq!(
            view.apply(ViewInput::LocalCommentDeleted(CommentId(5))),
            Outcome::Removed
        );
        assert!(view.thread.is_empty());
    }

    #[test]
    fn test_order_view_keeps_order_in_sync() {
        let order = Order {
            id: OrderId(3),
            product_id: ProductId(1),
            buyer_id: UserId(8),
            seller_id: UserId(9),
            status: OrderStatus::PendingPayment,
            final_price: 120,
            created_at: at(),
        };
        let mut view = OrderLiveView::new(order, Some(UserId(8)), Vec::new());

        view.apply(
            LiveEvent::OrderStatusChanged {
                order_id: OrderId(3),
                status: OrderStatus::Paid,
            }
            .into(),
        );
        assert_eq!(view.order.status, OrderStatus::Paid);

        let line = ChatMessage {
            id: ChatMessageId(1),
            sender_id: UserId(8),
            message: "Shipped yet?".to_string(),
            created_at: at(),
        };
        assert_eq!(view.apply(ViewInput::LocalChat(line.clone())), Outcome::Appended);
        assert!(!view
            .apply(LiveEvent::ChatMessage { message: line }.into())
            .changed());
        assert!(view.chat.entries()[0].is_own);

        assert_eq!(view.apply(ViewInput::Viewer(None)), Outcome::Replaced);
        assert!(!view.chat.entries()[0].is_own);
    }
}
