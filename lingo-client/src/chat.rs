use std::sync::OnceLock;

use lingo_common::{ChatToken, UserId};
use tokio::sync::Mutex;
use tracing::info;

use crate::client::{ApiClient, FriendApi};
use crate::error::{ClientError, Result};

/// Credentials for the hosted chat provider, bound to one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatConnection {
    pub user_id: UserId,
    pub token: String,
    pub api_key: Option<String>,
}

/// Holds at most one chat connection per signed-in session.
///
/// The first [`connect`](Self::connect) fetches a token; later calls for the
/// same user reuse it. The connection is only dropped by
/// [`disconnect`](Self::disconnect) or [`logout`](Self::logout).
#[derive(Debug, Default)]
pub struct ChatSession {
    connection: Mutex<Option<ChatConnection>>,
}

static SHARED: OnceLock<ChatSession> = OnceLock::new();

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide session used by the app shell.
    pub fn shared() -> &'static ChatSession {
        SHARED.get_or_init(ChatSession::new)
    }

    pub async fn connect<A>(&self, api: &A, user: &UserId) -> Result<ChatConnection>
    where
        A: FriendApi + ?Sized,
    {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            if &connection.user_id != user {
                return Err(ClientError::ChatUserMismatch {
                    connected: connection.user_id.clone(),
                    requested: user.clone(),
                });
            }
            return Ok(connection.clone());
        }
        let ChatToken { token, api_key } = api.chat_token().await?;
        if token.is_empty() {
            return Err(ClientError::MissingChatToken);
        }
        let connection = ChatConnection { user_id: user.clone(), token, api_key };
        info!(user_id = %user, "chat connected");
        *slot = Some(connection.clone());
        Ok(connection)
    }

    pub async fn current(&self) -> Option<ChatConnection> {
        self.connection.lock().await.clone()
    }

    pub async fn disconnect(&self) -> Option<ChatConnection> {
        let previous = self.connection.lock().await.take();
        if let Some(connection) = &previous {
            info!(user_id = %connection.user_id, "chat disconnected");
        }
        previous
    }

    /// Tears the chat connection down, then ends the server session.
    pub async fn logout(&self, api: &ApiClient) -> Result<()> {
        self.disconnect().await;
        api.logout().await
    }
}

/// Direct-message channel shared by two users, independent of who opens it.
pub fn channel_id(a: &UserId, b: &UserId) -> String {
    let mut members = [a.0.as_str(), b.0.as_str()];
    members.sort_unstable();
    members.join("-")
}

pub fn video_call_message(origin: &str, channel_id: &str) -> String {
    format!("I've started a video call. Join me here: {}/call/{channel_id}", origin.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lingo_common::{FriendRequest, FriendRequestId, FriendRequestView, FriendRequests, User};

    use super::*;

    #[derive(Default)]
    struct TokenApi {
        issued: AtomicUsize,
        blank: bool,
    }

    #[async_trait]
    impl FriendApi for TokenApi {
        async fn outgoing_friend_requests(&self) -> Result<Vec<FriendRequestView>> {
            Ok(Vec::new())
        }
        async fn send_friend_request(&self, _: &UserId) -> Result<FriendRequest> {
            Ok(FriendRequest::default())
        }
        async fn friend_requests(&self) -> Result<FriendRequests> {
            Ok(FriendRequests::default())
        }
        async fn friends(&self) -> Result<Vec<User>> {
            Ok(Vec::new())
        }
        async fn accept_friend_request(&self, _: &FriendRequestId) -> Result<FriendRequest> {
            Ok(FriendRequest::default())
        }
        async fn chat_token(&self) -> Result<ChatToken> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            let token = if self.blank { String::new() } else { format!("token-{n}") };
            Ok(ChatToken { token, api_key: Some(String::from("pk-test")) })
        }
    }

    #[tokio::test]
    async fn connection_is_reused_for_the_same_user() {
        let api = TokenApi::default();
        let session = ChatSession::new();
        let ana = UserId::from("ana");

        let first = session.connect(&api, &ana).await.unwrap();
        let second = session.connect(&api, &ana).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.api_key.as_deref(), Some("pk-test"));
        assert_eq!(api.issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn another_user_needs_an_explicit_disconnect() {
        let api = TokenApi::default();
        let session = ChatSession::new();
        session.connect(&api, &UserId::from("ana")).await.unwrap();

        let err = session.connect(&api, &UserId::from("bo")).await.unwrap_err();
        assert!(matches!(err, ClientError::ChatUserMismatch { .. }));

        assert_eq!(session.disconnect().await.unwrap().user_id, UserId::from("ana"));
        assert_eq!(session.current().await, None);
        let bo = session.connect(&api, &UserId::from("bo")).await.unwrap();
        assert_eq!(bo.token, "token-1");
    }

    #[tokio::test]
    async fn blank_tokens_are_refused() {
        let api = TokenApi { blank: true, ..Default::default() };
        let session = ChatSession::new();
        let err = session.connect(&api, &UserId::from("ana")).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingChatToken));
        assert_eq!(session.current().await, None);
    }

    #[test]
    fn shared_session_is_a_single_instance() {
        assert!(std::ptr::eq(ChatSession::shared(), ChatSession::shared()));
    }

    #[test]
    fn channel_ids_do_not_depend_on_order() {
        let (a, b) = (UserId::from("65a1"), UserId::from("12f0"));
        assert_eq!(channel_id(&a, &b), "12f0-65a1");
        assert_eq!(channel_id(&b, &a), "12f0-65a1");
    }

    #[test]
    fn video_call_link() {
        assert_eq!(
            video_call_message("https://lingo.app/", "12f0-65a1"),
            "I've started a video call. Join me here: https://lingo.app/call/12f0-65a1"
        );
    }
}
