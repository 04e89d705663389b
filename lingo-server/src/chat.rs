use axum::response::IntoResponse;
use axum::{Extension, Json};
use hmac::{Hmac, Mac};
use lingo_common::{ChatToken, UserId};
use sha2::Sha256;
use tracing::error;

use crate::auth::AuthUser;
use crate::{AppError, Result, State};

type HmacSha256 = Hmac<Sha256>;

pub async fn get_chat_token(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    let Some(secret) = state.config.stream_api_secret.as_deref() else {
        error!(user_id = %auth.id, "chat token requested but no chat secret is configured");
        return Err(AppError::internal("Chat service is not configured"));
    };
    Ok(Json(ChatToken {
        token: create_chat_token(&auth.id, secret)?,
        api_key: state.config.stream_api_key.clone(),
    }))
}

/// `<user id>.<hex hmac-sha256 of the user id>`
pub fn create_chat_token(user: &UserId, secret: &str) -> Result<String> {
    if user.0.is_empty() {
        return Err(AppError::bad_request("User ID is required"));
    }
    let mut mac = mac(secret)?;
    mac.update(user.0.as_bytes());
    Ok(format!("{}.{}", user.0, hex::encode(mac.finalize().into_bytes())))
}

/// Returns the user a token was issued to, if the signature holds.
pub fn verify_chat_token(token: &str, secret: &str) -> Option<UserId> {
    let (user, signature) = token.rsplit_once('.')?;
    let signature = hex::decode(signature).ok()?;
    let mut mac = mac(secret).ok()?;
    mac.update(user.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(UserId(user.to_string()))
}

fn mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::internal("Invalid chat secret"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_verify_only_with_their_secret() {
        let user = UserId::from("0b5c1e7a");
        let token = create_chat_token(&user, "s3cret").unwrap();
        assert!(token.starts_with("0b5c1e7a."));
        assert_eq!(verify_chat_token(&token, "s3cret"), Some(user));
        assert_eq!(verify_chat_token(&token, "other"), None);
        assert_eq!(verify_chat_token("0b5c1e7a.zz", "s3cret"), None);
    }

    #[test]
    fn tampered_user_is_rejected() {
        let token = create_chat_token(&UserId::from("ana"), "s3cret").unwrap();
        let forged = token.replacen("ana", "bob", 1);
        assert_eq!(verify_chat_token(&forged, "s3cret"), None);
    }

    #[test]
    fn empty_user_is_rejected() {
        assert!(create_chat_token(&UserId::default(), "s3cret").is_err());
    }
}
