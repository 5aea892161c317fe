//! Product and order pages wired to the live layer.
//!
//! A feed fetches the initial state over REST, starts a [`LiveView`] and
//! mounts one connection per topic the page needs. Writes go to the backend
//! first; on success their result is pushed through the view's inbox so it
//! is ordered with the remote events.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use gavel_net::{ConnectionManager, LiveTopic, MountRequest};
use gavel_shared::{
    Bid, ChatMessage, Comment, CommentId, ConnectionState, OrderId, ProductId, UserId,
    ViewerRole,
};

use crate::api::{OrderApi, ProductApi};
use crate::auth::handle_auth_failure;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::live::LiveView;
use crate::reconcile::ViewInput;
use crate::session::{Session, SessionStore};
use crate::view::{OrderLiveView, ProductLiveView};

/// Pass `result` through, signing out first if it is an auth rejection.
fn check_auth<T>(session: &SessionStore, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        handle_auth_failure(session, e);
    }
    result
}

fn require_token(session: &SessionStore) -> Result<String> {
    session.access_token().ok_or(ClientError::NotAuthenticated)
}

fn viewer_of(session: &Session) -> Option<UserId> {
    session.user.as_ref().map(|u| u.id)
}

pub struct ProductFeed {
    product: ProductId,
    seller: UserId,
    api: Arc<dyn ProductApi>,
    session: SessionStore,
    session_rx: watch::Receiver<Session>,
    view: LiveView<ProductLiveView>,
    comments: ConnectionManager<ViewInput>,
    bids: ConnectionManager<ViewInput>,
}

impl ProductFeed {
    pub async fn open(
        config: &ClientConfig,
        api: Arc<dyn ProductApi>,
        session: SessionStore,
        product: ProductId,
    ) -> Result<Self> {
        if !product.is_valid() {
            return Err(ClientError::InvalidId(product.0));
        }

        let token = session.access_token();
        let details = check_auth(&session, api.product(product).await)?;
        let page = check_auth(
            &session,
            api.comments(product, 0, config.page_size, token.as_deref())
                .await,
        )?;
        let bids = check_auth(&session, api.bids(product, token.as_deref()).await)?;

        let view = LiveView::spawn(
            ProductLiveView::new(
                product,
                page.content,
                bids,
                details.summary(),
                config.echo_capacity,
            ),
            config.inbox_capacity,
        );
        let inbox = view.handle().sender();

        let mut feed = Self {
            product,
            seller: details.seller_id,
            api,
            session_rx: session.subscribe(),
            session,
            view,
            comments: ConnectionManager::new(config.live(), inbox.clone()),
            bids: ConnectionManager::new(config.live(), inbox),
        };
        feed.sync_session().await;

        info!(product = %product, "Product feed opened");
        Ok(feed)
    }

    /// Re-derive the connections from the current session: the seller moves
    /// to the unmasked comment topic, and a new token reconnects.
    pub async fn sync_session(&mut self) -> (ConnectionState, ConnectionState) {
        let session = self.session_rx.borrow_and_update().clone();
        let token = session.access_token().map(str::to_string);
        let role = ViewerRole::for_viewer(viewer_of(&session), self.seller);

        let comments = self
            .comments
            .mount(MountRequest::new(
                LiveTopic::ProductComments {
                    product: self.product,
                    role,
                },
                token.clone(),
            ))
            .await;
        let bids = self
            .bids
            .mount(MountRequest::new(
                LiveTopic::ProductBids {
                    product: self.product,
                },
                token,
            ))
            .await;
        (comments, bids)
    }

    /// Wait for the next session change and apply it. Returns `false` once
    /// the session store is gone.
    pub async fn next_session_change(&mut self) -> bool {
        if self.session_rx.changed().await.is_err() {
            return false;
        }
        self.sync_session().await;
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<ProductLiveView> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> watch::Ref<'_, ProductLiveView> {
        self.view.snapshot()
    }

    pub fn comments_state(&self) -> watch::Receiver<ConnectionState> {
        self.comments.subscribe_state()
    }

    pub fn bids_state(&self) -> watch::Receiver<ConnectionState> {
        self.bids.subscribe_state()
    }

    pub async fn post_comment(&self, content: &str, parent: Option<CommentId>) -> Result<Comment> {
        let token = require_token(&self.session)?;
        let comment = check_auth(
            &self.session,
            self.api
                .post_comment(self.product, &token, content, parent)
                .await,
        )?;
        debug!(product = %self.product, comment = %comment.id, "Comment posted");
        self.view
            .submit(ViewInput::LocalComment(comment.clone()))
            .await?;
        Ok(comment)
    }

    pub async fn delete_comment(&self, comment: CommentId) -> Result<()> {
        let token = require_token(&self.session)?;
        check_auth(&self.session, self.api.delete_comment(comment, &token).await)?;
        self.view
            .submit(ViewInput::LocalCommentDeleted(comment))
            .await
    }

    /// Place a bid. The board is updated by the bid's broadcast, which
    /// carries the server-computed price summary.
    pub async fn place_bid(&self, amount: i64, max_amount: Option<i64>) -> Result<Bid> {
        let token = require_token(&self.session)?;
        let bid = check_auth(
            &self.session,
            self.api
                .place_bid(self.product, &token, amount, max_amount)
                .await,
        )?;
        debug!(product = %self.product, bid = %bid.id, amount, "Bid placed");
        Ok(bid)
    }

    /// Unmount both connections, then stop the view.
    pub async fn close(self) {
        let Self {
            product,
            view,
            mut comments,
            mut bids,
            ..
        } = self;
        comments.unmount().await;
        bids.unmount().await;
        // Managers hold inbox senders; the view drains once they are gone.
        drop((comments, bids));
        view.close().await;
        info!(product = %product, "Product feed closed");
    }
}

pub struct OrderFeed {
    order: OrderId,
    api: Arc<dyn OrderApi>,
    session: SessionStore,
    session_rx: watch::Receiver<Session>,
    view: LiveView<OrderLiveView>,
    status: ConnectionManager<ViewInput>,
    chat: ConnectionManager<ViewInput>,
}

impl OrderFeed {
    pub async fn open(
        config: &ClientConfig,
        api: Arc<dyn OrderApi>,
        session: SessionStore,
        order: OrderId,
    ) -> Result<Self> {
        if !order.is_valid() {
            return Err(ClientError::InvalidId(order.0));
        }

        let token = require_token(&session)?;
        let details = check_auth(&session, api.order(order, &token).await)?;
        let history = check_auth(&session, api.chat_messages(order, &token).await)?;

        let viewer = viewer_of(&session.snapshot());
        let view = LiveView::spawn(
            OrderLiveView::new(details, viewer, history),
            config.inbox_capacity,
        );
        let inbox = view.handle().sender();

        let mut feed = Self {
            order,
            api,
            session_rx: session.subscribe(),
            session,
            view,
            status: ConnectionManager::new(config.live(), inbox.clone()),
            chat: ConnectionManager::new(config.live(), inbox),
        };
        feed.sync_session().await;

        info!(order = %order, "Order feed opened");
        Ok(feed)
    }

    /// Re-derive the connections and chat ownership from the current
    /// session. Both topics need a token, so signing out disables them.
    pub async fn sync_session(&mut self) -> (ConnectionState, ConnectionState) {
        let session = self.session_rx.borrow_and_update().clone();
        let token = session.access_token().map(str::to_string);

        if self
            .view
            .submit(ViewInput::Viewer(viewer_of(&session)))
            .await
            .is_err()
        {
            debug!(order = %self.order, "View closed before viewer update");
        }

        let status = self
            .status
            .mount(MountRequest::new(
                LiveTopic::OrderStatus { order: self.order },
                token.clone(),
            ))
            .await;
        let chat = self
            .chat
            .mount(MountRequest::new(
                LiveTopic::OrderChat { order: self.order },
                token,
            ))
            .await;
        (status, chat)
    }

    /// Wait for the next session change and apply it. Returns `false` once
    /// the session store is gone.
    pub async fn next_session_change(&mut self) -> bool {
        if self.session_rx.changed().await.is_err() {
            return false;
        }
        self.sync_session().await;
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<OrderLiveView> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> watch::Ref<'_, OrderLiveView> {
        self.view.snapshot()
    }

    pub fn status_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe_state()
    }

    pub fn chat_state(&self) -> watch::Receiver<ConnectionState> {
        self.chat.subscribe_state()
    }

    pub async fn send_message(&self, message: &str) -> Result<ChatMessage> {
        let token = require_token(&self.session)?;
        let sent = check_auth(
            &self.session,
            self.api.send_chat_message(self.order, &token, message).await,
        )?;
        self.view.submit(ViewInput::LocalChat(sent.clone())).await?;
        Ok(sent)
    }

    /// Unmount both connections, then stop the view.
    pub async fn close(self) {
        let Self {
            order,
            view,
            mut status,
            mut chat,
            ..
        } = self;
        status.unmount().await;
        chat.unmount().await;
        drop((status, chat));
        view.close().await;
        info!(order = %order, "Order feed closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthGrant;
    use crate::session::SessionEvent;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use gavel_shared::protocol::Page;
    use gavel_shared::{BidId, ChatMessageId, Order, OrderStatus, Product, User, UserRole};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    const SELLER: UserId = UserId(9);
    const BUYER: UserId = UserId(8);

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    fn config() -> ClientConfig {
        ClientConfig {
            ws_url: "ws://127.0.0.1:9/ws".to_string(),
            reconnect_delay: Duration::from_secs(60),
            ..ClientConfig::default()
        }
    }

    fn signed_in(user: UserId, token: &str) -> SessionStore {
        let store = SessionStore::new();
        store.dispatch(SessionEvent::LoggedIn(AuthGrant {
            access_token: token.to_string(),
            user: User {
                id: user,
                email: format!("user{}@example.com", user.0),
                nickname: format!("user{}", user.0),
                role: UserRole::User,
            },
        }));
        store
    }

    fn guest() -> SessionStore {
        let store = SessionStore::new();
        store.dispatch(SessionEvent::RestoreFailed);
        store
    }

    struct MockProductApi {
        next_id: AtomicI64,
    }

    impl MockProductApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicI64::new(100),
            })
        }
    }

    #[async_trait]
    impl ProductApi for MockProductApi {
        async fn product(&self, id: ProductId) -> Result<Product> {
            Ok(Product {
                id,
                title: "Film camera".to_string(),
                seller_id: SELLER,
                starting_price: 50,
                current_price: 100,
                bid_count: 3,
                highest_bidder: Some("jo***".to_string()),
                ends_at: at(),
            })
        }

        async fn comments(
            &self,
            _id: ProductId,
            page: u32,
            size: u32,
            _token: Option<&str>,
        ) -> Result<Page<Comment>> {
            Ok(Page {
                content: Vec::new(),
                number: page,
                size,
                total_elements: 0,
                total_pages: 0,
                first: true,
                last: true,
            })
        }

        async fn post_comment(
            &self,
            _id: ProductId,
            token: &str,
            content: &str,
            parent: Option<CommentId>,
        ) -> Result<Comment> {
            if token == "expired" {
                return Err(ClientError::Unauthorized);
            }
            Ok(Comment {
                id: CommentId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                parent_id: parent,
                content: content.to_string(),
                created_at: at(),
                author_display: "us***".to_string(),
                identity_revealed: false,
                replies: Vec::new(),
            })
        }

        async fn delete_comment(&self, _comment: CommentId, _token: &str) -> Result<()> {
            Ok(())
        }

        async fn bids(&self, _id: ProductId, _token: Option<&str>) -> Result<Vec<Bid>> {
            Ok(Vec::new())
        }

        async fn place_bid(
            &self,
            id: ProductId,
            _token: &str,
            amount: i64,
            max_amount: Option<i64>,
        ) -> Result<Bid> {
            Ok(Bid {
                id: BidId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                product_id: id,
                bidder_id: BUYER,
                bid_amount: amount,
                max_bid_amount: max_amount,
                is_highest_bidder: true,
                created_at: at(),
            })
        }
    }

    struct MockOrderApi;

    #[async_trait]
    impl OrderApi for MockOrderApi {
        async fn order(&self, id: OrderId, _token: &str) -> Result<Order> {
            Ok(Order {
                id,
                product_id: ProductId(1),
                buyer_id: BUYER,
                seller_id: SELLER,
                status: OrderStatus::Paid,
                final_price: 120,
                created_at: at(),
            })
        }

        async fn chat_messages(&self, _id: OrderId, _token: &str) -> Result<Vec<ChatMessage>> {
            Ok(vec![ChatMessage {
                id: ChatMessageId(1),
                sender_id: SELLER,
                message: "Thanks for your order".to_string(),
                created_at: at(),
            }])
        }

        async fn send_chat_message(
            &self,
            _id: OrderId,
            _token: &str,
            message: &str,
        ) -> Result<ChatMessage> {
            Ok(ChatMessage {
                id: ChatMessageId(2),
                sender_id: BUYER,
                message: message.to_string(),
                created_at: at(),
            })
        }
    }

    async fn wait_for<V, F>(rx: &mut watch::Receiver<V>, mut done: F)
    where
        F: FnMut(&V) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if done(&*rx.borrow_and_update()) {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_product_id_rejected() {
        let err = ProductFeed::open(&config(), MockProductApi::new(), guest(), ProductId(0))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidId(0)));
    }

    #[tokio::test]
    async fn test_guest_product_feed_is_read_only() {
        let mut feed = ProductFeed::open(&config(), MockProductApi::new(), guest(), ProductId(1))
            .await
            .unwrap();

        assert_eq!(feed.snapshot().board.summary().bid_count, 3);
        assert_eq!(
            feed.comments.current().map(|r| r.topic),
            Some(LiveTopic::ProductComments {
                product: ProductId(1),
                role: ViewerRole::Public,
            })
        );
        // Same session: nothing is reopened.
        let (comments, bids) = feed.sync_session().await;
        assert_ne!(comments, ConnectionState::Disabled);
        assert_ne!(bids, ConnectionState::Disabled);

        let err = feed.post_comment("hello", None).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));

        feed.close().await;
    }

    #[tokio::test]
    async fn test_posted_comment_lands_in_view() {
        let session = signed_in(BUYER, "buyer-token");
        let feed = ProductFeed::open(&config(), MockProductApi::new(), session, ProductId(1))
            .await
            .unwrap();
        let mut rx = feed.subscribe();

        let comment = feed.post_comment("Is the lens included?", None).await.unwrap();
        wait_for(&mut rx, |v| v.thread.find(comment.id).is_some()).await;

        feed.delete_comment(comment.id).await.unwrap();
        wait_for(&mut rx, |v| v.thread.is_empty()).await;

        let bid = feed.place_bid(130, Some(150)).await.unwrap();
        assert_eq!(bid.bid_amount, 130);

        feed.close().await;
    }

    #[tokio::test]
    async fn test_seller_subscribes_to_unmasked_topic() {
        let session = signed_in(SELLER, "seller-token");
        let feed = ProductFeed::open(&config(), MockProductApi::new(), session, ProductId(1))
            .await
            .unwrap();

        let current = feed.comments.current().unwrap();
        assert_eq!(
            current.topic.destination(),
            "/topic/products/1/comments/seller"
        );
        assert_eq!(current.token.as_deref(), Some("seller-token"));

        feed.close().await;
    }

    #[tokio::test]
    async fn test_rejected_token_signs_out() {
        let session = signed_in(BUYER, "expired");
        let feed = ProductFeed::open(&config(), MockProductApi::new(), session.clone(), ProductId(1))
            .await
            .unwrap();

        let err = feed.post_comment("hello", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
        assert!(!session.snapshot().is_authenticated());

        feed.close().await;
    }

    #[tokio::test]
    async fn test_order_feed_requires_sign_in() {
        let err = OrderFeed::open(&config(), Arc::new(MockOrderApi), guest(), OrderId(3))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_order_feed_follows_session() {
        let session = signed_in(BUYER, "buyer-token");
        let mut feed = OrderFeed::open(&config(), Arc::new(MockOrderApi), session.clone(), OrderId(3))
            .await
            .unwrap();
        let mut rx = feed.subscribe();

        assert!(feed.status.current().is_some());
        assert!(feed.chat.current().is_some());

        let sent = feed.send_message("Any tracking number?").await.unwrap();
        wait_for(&mut rx, |v| {
            v.chat
                .entries()
                .iter()
                .any(|e| e.message.id == sent.id && e.is_own)
        })
        .await;

        session.dispatch(SessionEvent::LoggedOut);
        assert!(feed.next_session_change().await);

        assert!(feed.status.current().is_none());
        assert_eq!(*feed.chat_state().borrow(), ConnectionState::Disabled);
        wait_for(&mut rx, |v| v.chat.entries().iter().all(|e| !e.is_own)).await;

        let err = feed.send_message("hello?").await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));

        feed.close().await;
    }
}
