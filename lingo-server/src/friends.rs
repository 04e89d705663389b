use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use lingo_common::{FriendRequestId, FriendRequestStatus, FriendRequests, SendFriendRequest, User};
use tracing::info;

use crate::auth::AuthUser;
use crate::{AppError, Result, State};

/// Onboarded learners that are neither the caller nor already friends.
pub async fn get_recommended_users(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    let me = state.users.user(&auth.id)?;
    let recommended: Vec<User> = state
        .users
        .all_users()?
        .into_iter()
        .map(|user| user.profile)
        .filter(|profile| profile.id != auth.id && profile.is_onboarded && !me.is_friend(&profile.id))
        .collect();
    Ok(Json(recommended))
}

pub async fn get_friends(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    let me = state.users.user(&auth.id)?;
    Ok(Json(state.users.profiles(&me.friends)?))
}

pub async fn post_send_friend_request(
    Extension(state): Extension<State>,
    auth: AuthUser,
    Json(payload): Json<SendFriendRequest>,
) -> Result<impl IntoResponse> {
    let recipient = payload.recipient_id;
    if recipient == auth.id {
        return Err(AppError::bad_request("You can't send friend request to yourself"));
    }
    let recipient_data = match state.users.user(&recipient) {
        Ok(data) => data,
        Err(err) if err.status == StatusCode::NOT_FOUND => return Err(AppError::not_found("Recipient not found")),
        Err(err) => return Err(err),
    };
    if recipient_data.is_friend(&auth.id) {
        return Err(AppError::already_friends());
    }
    let request = state.users.open_request(&auth.id, &recipient)?;
    info!(request_id = %request.id, user_id = %auth.id, recipient_id = %recipient, "friend request sent");
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn put_accept_friend_request(
    Extension(state): Extension<State>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut request = state.users.request(&FriendRequestId(id))?;
    if request.recipient != auth.id {
        return Err(AppError::forbidden("You are not authorized to accept this request"));
    }
    if request.status != FriendRequestStatus::Pending {
        return Err(AppError::bad_request("Friend request is no longer pending"));
    }
    state.users.accept_request(&mut request)?;
    info!(request_id = %request.id, user_id = %auth.id, "friend request accepted");
    Ok(Json(request))
}

pub async fn get_friend_requests(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    let incoming_reqs = state
        .users
        .requests_where(|request| request.recipient == auth.id && request.status == FriendRequestStatus::Pending)?;
    let accepted_reqs = state
        .users
        .requests_where(|request| request.sender == auth.id && request.status == FriendRequestStatus::Accepted)?;
    Ok(Json(FriendRequests { incoming_reqs, accepted_reqs }))
}

pub async fn get_outgoing_friend_requests(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    Ok(Json(state.users.requests_where(|request| {
        request.sender == auth.id && request.status == FriendRequestStatus::Pending
    })?))
}
