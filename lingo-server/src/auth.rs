use anyhow::Context;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use lingo_common::{AuthResponse, LoginRequest, MeResponse, OnboardingRequest, SignupRequest, UserId};
use tracing::info;

use crate::{AppError, Result, State};

/// Caller resolved from the `Authorization: Bearer <token>` header.
pub struct AuthUser {
    pub id: UserId,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let state = parts.extensions.get::<State>().cloned().context("State extension missing")?;
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Unauthorized - No token provided"))?;
        let id = state
            .users
            .session_user(token)?
            .ok_or_else(|| AppError::unauthorized("Unauthorized - Invalid token"))?;
        Ok(Self { id, token: token.to_string() })
    }
}

pub async fn signup(Extension(state): Extension<State>, Json(payload): Json<SignupRequest>) -> Result<impl IntoResponse> {
    if payload.full_name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AppError::bad_request("All fields are required"));
    }
    if !is_email(payload.email.trim()) {
        return Err(AppError::bad_request("Invalid email format"));
    }
    let user = state.users.create_user(&payload)?;
    let token = state.users.create_session(&user.id)?;
    info!(user_id = %user.id, "signed up");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Opens a new session for an existing account. Email is the only credential.
pub async fn login(Extension(state): Extension<State>, Json(payload): Json<LoginRequest>) -> Result<impl IntoResponse> {
    if payload.email.trim().is_empty() {
        return Err(AppError::bad_request("All fields are required"));
    }
    let id = state
        .users
        .user_by_email(&payload.email)?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;
    let token = state.users.create_session(&id)?;
    info!(user_id = %id, "logged in");
    Ok(Json(AuthResponse { user: state.users.profile(&id)?, token }))
}

pub async fn logout(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    state.users.end_session(&auth.token)?;
    info!(user_id = %auth.id, "logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(state): Extension<State>, auth: AuthUser) -> Result<impl IntoResponse> {
    Ok(Json(MeResponse { user: state.users.profile(&auth.id)? }))
}

pub async fn onboarding(
    Extension(state): Extension<State>,
    auth: AuthUser,
    Json(payload): Json<OnboardingRequest>,
) -> Result<impl IntoResponse> {
    let missing = missing_onboarding_fields(&payload);
    if !missing.is_empty() {
        return Err(AppError::bad_request(format!("All fields are required, missing: {}", missing.join(", "))));
    }
    state.users.user_mut(&auth.id, |user| {
        let profile = &mut user.profile;
        profile.full_name = payload.full_name.trim().to_string();
        profile.bio = payload.bio.trim().to_string();
        profile.native_language = payload.native_language.trim().to_string();
        profile.learning_language = payload.learning_language.trim().to_string();
        profile.location = payload.location.trim().to_string();
        profile.is_onboarded = true;
    })?;
    info!(user_id = %auth.id, "onboarded");
    Ok(Json(MeResponse { user: state.users.profile(&auth.id)? }))
}

fn missing_onboarding_fields(payload: &OnboardingRequest) -> Vec<&'static str> {
    [
        ("fullName", &payload.full_name),
        ("nativeLanguage", &payload.native_language),
        ("learningLanguage", &payload.learning_language),
        ("location", &payload.location),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

fn is_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(char::is_whitespace),
        None => false,
    }
}
