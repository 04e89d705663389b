use std::sync::Arc;

use async_trait::async_trait;
use lingo_common::{
    ApiError, AuthResponse, ChatToken, ErrorCode, FriendRequest, FriendRequestId, FriendRequestView,
    FriendRequests, LoginRequest, MeResponse, OnboardingRequest, SendFriendRequest, SignupRequest, User, UserId,
};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// The calls the friend-request sync core depends on.
#[async_trait]
pub trait FriendApi: Send + Sync {
    async fn outgoing_friend_requests(&self) -> Result<Vec<FriendRequestView>>;
    async fn send_friend_request(&self, recipient: &UserId) -> Result<FriendRequest>;
    async fn friend_requests(&self) -> Result<FriendRequests>;
    async fn friends(&self) -> Result<Vec<User>>;
    async fn accept_friend_request(&self, request: &FriendRequestId) -> Result<FriendRequest>;
    async fn chat_token(&self) -> Result<ChatToken>;
}

/// HTTP client for the Lingo API. Clones share the session token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token: Default::default(),
        }
    }
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base.clone())
    }
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write() = Some(token.into());
        self
    }
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub async fn signup(&self, signup: &SignupRequest) -> Result<AuthResponse> {
        let auth: AuthResponse = send(self.public(Method::POST, "/auth/signup").json(signup)).await?;
        *self.token.write() = Some(auth.token.clone());
        Ok(auth)
    }
    pub async fn login(&self, login: &LoginRequest) -> Result<AuthResponse> {
        let auth: AuthResponse = send(self.public(Method::POST, "/auth/login").json(login)).await?;
        *self.token.write() = Some(auth.token.clone());
        Ok(auth)
    }
    /// Ends the server session. The local token is dropped even if the call fails.
    pub async fn logout(&self) -> Result<()> {
        let builder = self.authed(Method::POST, "/auth/logout");
        self.token.write().take();
        check(builder?.send().await?).await?;
        Ok(())
    }
    pub async fn me(&self) -> Result<User> {
        Ok(send::<MeResponse>(self.authed(Method::GET, "/auth/me")?).await?.user)
    }
    pub async fn complete_onboarding(&self, onboarding: &OnboardingRequest) -> Result<User> {
        Ok(send::<MeResponse>(self.authed(Method::POST, "/auth/onboarding")?.json(onboarding)).await?.user)
    }
    pub async fn recommended_users(&self) -> Result<Vec<User>> {
        send(self.authed(Method::GET, "/users")?).await
    }

    fn url(&self, path: &str) -> String {
        self.base.clone() + path
    }
    fn public(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }
    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token().ok_or(ClientError::Unauthenticated)?;
        Ok(self.public(method, path).bearer_auth(token))
    }
}

#[async_trait]
impl FriendApi for ApiClient {
    async fn outgoing_friend_requests(&self) -> Result<Vec<FriendRequestView>> {
        send(self.authed(Method::GET, "/users/outgoing-friend-requests")?).await
    }
    async fn send_friend_request(&self, recipient: &UserId) -> Result<FriendRequest> {
        let body = SendFriendRequest { recipient_id: recipient.clone() };
        send(self.authed(Method::POST, "/users/friend-request")?.json(&body)).await
    }
    async fn friend_requests(&self) -> Result<FriendRequests> {
        send(self.authed(Method::GET, "/users/friend-requests")?).await
    }
    async fn friends(&self) -> Result<Vec<User>> {
        send(self.authed(Method::GET, "/users/friends")?).await
    }
    async fn accept_friend_request(&self, request: &FriendRequestId) -> Result<FriendRequest> {
        let path = format!("/users/friend-request/{}/accept", request.0);
        send(self.authed(Method::PUT, &path)?).await
    }
    async fn chat_token(&self) -> Result<ChatToken> {
        send(self.authed(Method::GET, "/chat/token")?).await
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
    let body = check(builder.send().await?).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Turns a non-2xx response into [`ClientError::Api`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), %body, "api call failed");
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError { message, code }) => ClientError::Api { status, code, message },
        Err(_) => ClientError::Api {
            status,
            code: ErrorCode::Internal,
            message: format!("Request failed (HTTP {status})"),
        },
    }
}
