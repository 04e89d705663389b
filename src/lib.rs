pub mod non_api_structs;

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserId(pub String);
impl AsRef<UserId> for UserId {
    fn as_ref(&self) -> &UserId {
        self
    }
}
impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct FriendRequestId(pub String);
impl From<&str> for FriendRequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
impl fmt::Display for FriendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public profile of a user. Everything the client renders about another
/// learner comes from here.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_pic: String,
    #[serde(default)]
    pub native_language: String,
    #[serde(default)]
    pub learning_language: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_onboarded: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
}

/// Friend request as stored by the server.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub sender: UserId,
    pub recipient: UserId,
    #[serde(default)]
    pub status: FriendRequestStatus,
}

/// Friend request with both ends resolved to profiles.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct FriendRequestView {
    pub id: FriendRequestId,
    pub sender: User,
    pub recipient: User,
    #[serde(default)]
    pub status: FriendRequestStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequests {
    #[serde(default)]
    pub incoming_reqs: Vec<FriendRequestView>,
    #[serde(default)]
    pub accepted_reqs: Vec<FriendRequestView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequest {
    pub recipient_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatToken {
    pub token: String,
    /// Public key of the chat provider, when the server has one configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Machine-readable reason attached to every failed API call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AlreadyRequested,
    AlreadyFriends,
    EmailTaken,
    NotFound,
    Forbidden,
    Unauthorized,
    BadRequest,
    #[default]
    Internal,
}

impl ErrorCode {
    /// The action the caller asked for already holds on the server, so the
    /// failure confirms rather than contradicts an optimistic update.
    pub fn is_already_satisfied(self) -> bool {
        matches!(self, ErrorCode::AlreadyRequested | ErrorCode::AlreadyFriends)
    }
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub code: ErrorCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_plain_json_strings() {
        let body = serde_json::to_string(&SendFriendRequest { recipient_id: UserId::from("u42") }).unwrap();
        assert_eq!(body, r#"{"recipientId":"u42"}"#);
    }

    #[test]
    fn friend_requests_use_wire_names() {
        let parsed: FriendRequests = serde_json::from_str(r#"{"incomingReqs":[],"acceptedReqs":[]}"#).unwrap();
        assert!(parsed.incoming_reqs.is_empty());
        let parsed: FriendRequests = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, FriendRequests::default());
    }

    #[test]
    fn chat_token_key_is_optional() {
        let parsed: ChatToken = serde_json::from_str(r#"{"token":"t"}"#).unwrap();
        assert_eq!(parsed.api_key, None);
        let body = serde_json::to_string(&ChatToken { token: "t".into(), api_key: Some("k".into()) }).unwrap();
        assert_eq!(body, r#"{"token":"t","apiKey":"k"}"#);
    }

    #[test]
    fn error_code_without_code_is_internal() {
        let parsed: ApiError = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(parsed.code, ErrorCode::Internal);
        let parsed: ApiError = serde_json::from_str(r#"{"message":"dup","code":"already_requested"}"#).unwrap();
        assert!(parsed.code.is_already_satisfied());
        assert!(ErrorCode::AlreadyFriends.is_already_satisfied());
        assert!(!ErrorCode::NotFound.is_already_satisfied());
    }
}
