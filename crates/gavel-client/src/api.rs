//! REST boundary.
//!
//! Every backend response is wrapped in the standard envelope
//! (`success`, `status`, `message`, `data` | `error`, `details`). The traits
//! below are the seams the session and feed code depend on; [`ApiClient`] is
//! the `reqwest` implementation.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use gavel_shared::protocol::{ApiResponse, Page};
use gavel_shared::{
    Bid, ChatMessage, Comment, CommentId, Order, OrderId, Product, ProductId, User,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Access token plus the user it belongs to.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub access_token: String,
    pub user: User,
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGrant")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Silent restore through the refresh cookie. `Ok(None)` when there is
    /// no session to restore.
    async fn refresh(&self) -> Result<Option<AuthGrant>>;

    async fn logout(&self, token: &str) -> Result<()>;

    async fn request_otp(&self, email: &str) -> Result<()>;

    async fn verify_otp(&self, email: &str, code: &str) -> Result<AuthGrant>;

    async fn me(&self, token: &str) -> Result<User>;
}

#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Product>;

    async fn comments(
        &self,
        id: ProductId,
        page: u32,
        size: u32,
        token: Option<&str>,
    ) -> Result<Page<Comment>>;

    async fn post_comment(
        &self,
        id: ProductId,
        token: &str,
        content: &str,
        parent: Option<CommentId>,
    ) -> Result<Comment>;

    async fn delete_comment(&self, comment: CommentId, token: &str) -> Result<()>;

    async fn bids(&self, id: ProductId, token: Option<&str>) -> Result<Vec<Bid>>;

    async fn place_bid(
        &self,
        id: ProductId,
        token: &str,
        amount: i64,
        max_amount: Option<i64>,
    ) -> Result<Bid>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn order(&self, id: OrderId, token: &str) -> Result<Order>;

    async fn chat_messages(&self, id: OrderId, token: &str) -> Result<Vec<ChatMessage>>;

    async fn send_chat_message(&self, id: OrderId, token: &str, message: &str)
        -> Result<ChatMessage>;
}

/// `reqwest`-backed implementation of every API trait.
///
/// The cookie store carries the refresh cookie used by [`AuthApi::refresh`];
/// the access token itself is only ever passed per call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "API request");
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.call(builder).await?.ok_or(ClientError::EmptyResponse)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<()> {
        self.call::<serde_json::Value>(builder).await.map(|_| ())
    }
}

/// Turn a raw response into the envelope's `data`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<Option<T>> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }

    if body.is_empty() {
        return if status.is_success() {
            Ok(None)
        } else {
            Err(api_failure(status))
        };
    }

    let envelope: ApiResponse<T> = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(api_failure(status)),
        Err(e) => return Err(ClientError::Decode(e)),
    };

    if !envelope.success || !status.is_success() {
        if envelope.status == StatusCode::UNAUTHORIZED.as_u16() {
            return Err(ClientError::Unauthorized);
        }
        return Err(ClientError::Api {
            status: envelope.status,
            message: envelope.failure_reason(),
        });
    }

    Ok(envelope.data)
}

fn api_failure(status: StatusCode) -> ClientError {
    ClientError::Api {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewComment<'a> {
    content: &'a str,
    parent_id: Option<CommentId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewBid {
    bid_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_bid_amount: Option<i64>,
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let req = self
            .request(Method::POST, "/auth/login", None)
            .json(&json!({ "email": email, "password": password }));
        self.fetch(req).await
    }

    async fn refresh(&self) -> Result<Option<AuthGrant>> {
        let req = self.request(Method::POST, "/auth/refresh", None);
        match self.call(req).await {
            Err(ClientError::Unauthorized) => Ok(None),
            other => other,
        }
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let req = self.request(Method::POST, "/auth/logout", Some(token));
        self.execute(req).await
    }

    async fn request_otp(&self, email: &str) -> Result<()> {
        let req = self
            .request(Method::POST, "/auth/otp/request", None)
            .json(&json!({ "email": email }));
        self.execute(req).await
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<AuthGrant> {
        let req = self
            .request(Method::POST, "/auth/otp/verify", None)
            .json(&json!({ "email": email, "code": code }));
        self.fetch(req).await
    }

    async fn me(&self, token: &str) -> Result<User> {
        let req = self.request(Method::GET, "/users/me", Some(token));
        self.fetch(req).await
    }
}

#[async_trait]
impl ProductApi for ApiClient {
    async fn product(&self, id: ProductId) -> Result<Product> {
        let req = self.request(Method::GET, &format!("/products/{id}"), None);
        self.fetch(req).await
    }

    async fn comments(
        &self,
        id: ProductId,
        page: u32,
        size: u32,
        token: Option<&str>,
    ) -> Result<Page<Comment>> {
        let req = self
            .request(Method::GET, &format!("/products/{id}/comments"), token)
            .query(&[("page", page), ("size", size)]);
        self.fetch(req).await
    }

    async fn post_comment(
        &self,
        id: ProductId,
        token: &str,
        content: &str,
        parent: Option<CommentId>,
    ) -> Result<Comment> {
        let req = self
            .request(Method::POST, &format!("/products/{id}/comments"), Some(token))
            .json(&NewComment {
                content,
                parent_id: parent,
            });
        self.fetch(req).await
    }

    async fn delete_comment(&self, comment: CommentId, token: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &format!("/comments/{comment}"), Some(token));
        self.execute(req).await
    }

    async fn bids(&self, id: ProductId, token: Option<&str>) -> Result<Vec<Bid>> {
        let req = self.request(Method::GET, &format!("/products/{id}/bids"), token);
        self.fetch(req).await
    }

    async fn place_bid(
        &self,
        id: ProductId,
        token: &str,
        amount: i64,
        max_amount: Option<i64>,
    ) -> Result<Bid> {
        let req = self
            .request(Method::POST, &format!("/products/{id}/bids"), Some(token))
            .json(&NewBid {
                bid_amount: amount,
                max_bid_amount: max_amount,
            });
        self.fetch(req).await
    }
}

#[async_trait]
impl OrderApi for ApiClient {
    async fn order(&self, id: OrderId, token: &str) -> Result<Order> {
        let req = self.request(Method::GET, &format!("/orders/{id}"), Some(token));
        self.fetch(req).await
    }

    async fn chat_messages(&self, id: OrderId, token: &str) -> Result<Vec<ChatMessage>> {
        let req = self.request(Method::GET, &format!("/orders/{id}/chat"), Some(token));
        self.fetch(req).await
    }

    async fn send_chat_message(
        &self,
        id: OrderId,
        token: &str,
        message: &str,
    ) -> Result<ChatMessage> {
        let req = self
            .request(Method::POST, &format!("/orders/{id}/chat"), Some(token))
            .json(&json!({ "message": message }));
        self.fetch(req).await
    }
}
