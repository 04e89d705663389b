use lingo_common::{ErrorCode, FriendRequestId, UserId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, code: ErrorCode, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The task resolving a dispatch panicked or was shut down.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("not signed in")]
    Unauthenticated,

    #[error("friend request {0} is not pending")]
    NotPending(FriendRequestId),

    #[error("No chat token received from backend")]
    MissingChatToken,

    #[error("chat is connected as {connected}, not {requested}")]
    ChatUserMismatch { connected: UserId, requested: UserId },
}

impl ClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            ClientError::Unauthenticated => Some(ErrorCode::Unauthorized),
            _ => None,
        }
    }

    /// True when the server reports that what was asked for already holds.
    pub fn is_already_satisfied(&self) -> bool {
        self.code().is_some_and(ErrorCode::is_already_satisfied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_structured_codes_count_as_satisfied() {
        let conflict = ClientError::Api {
            status: 409,
            code: ErrorCode::AlreadyRequested,
            message: "A friend request already exists between you and this user".into(),
        };
        assert!(conflict.is_already_satisfied());

        // the wording alone no longer decides the outcome
        let worded = ClientError::Api {
            status: 400,
            code: ErrorCode::BadRequest,
            message: "Friend request already sent (HTTP 400)".into(),
        };
        assert!(!worded.is_already_satisfied());
        assert!(!ClientError::Unauthenticated.is_already_satisfied());
    }
}
