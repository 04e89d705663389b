use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use lingo_common::{ApiError, ErrorCode};
use sled::Db;
use tokio::signal;
use tracing::{error, info};

pub mod auth;
pub mod chat;
pub mod config;
pub mod friends;
pub mod users;

use config::Config;
use users::Users;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure returned by a handler, rendered as an [`ApiError`] body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message)
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, message)
    }
    pub fn email_taken() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::EmailTaken, "Email already exists, please use a different one")
    }
    pub fn already_requested() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            ErrorCode::AlreadyRequested,
            "A friend request already exists between you and this user",
        )
    }
    pub fn already_friends() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::AlreadyFriends, "You are already friends with this user")
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiError { message: self.message, code: self.code })).into_response()
    }
}

// Anything `anyhow` understands (sled, serde_json, io...) becomes a 500.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        error!(error = %format!("{err:#}"), "request failed");
        Self::internal(format!("Something went wrong: {err}"))
    }
}

#[derive(Clone)]
pub struct State {
    pub users: Users,
    pub config: Arc<Config>,
}

impl State {
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let db = sled::open(&config.db_path)?;
        Self::with_db(&db, config)
    }
    /// Backed by a throwaway database that is removed on drop.
    pub fn temporary(config: Config) -> anyhow::Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(&db, config)
    }
    fn with_db(db: &Db, config: Config) -> anyhow::Result<Self> {
        let users = Users::new(db).map_err(|err| anyhow::anyhow!(err.message))?;
        Ok(Self { users, config: Arc::new(config) })
    }
}

pub fn app(state: State) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/onboarding", post(auth::onboarding))
        .route("/api/users", get(friends::get_recommended_users))
        .route("/api/users/friends", get(friends::get_friends))
        .route("/api/users/friend-request", post(friends::post_send_friend_request))
        .route("/api/users/friend-request/:id/accept", put(friends::put_accept_friend_request))
        .route("/api/users/friend-requests", get(friends::get_friend_requests))
        .route("/api/users/outgoing-friend-requests", get(friends::get_outgoing_friend_requests))
        .route("/api/chat/token", get(chat::get_chat_token))
        .layer(Extension(state))
}

async fn root() -> &'static str {
    "Lingo API"
}

/// Serves the API on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: State,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::Server::from_tcp(listener)?
        .serve(app(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    if config.stream_api_key.is_none() || config.stream_api_secret.is_none() {
        tracing::warn!("chat API key or secret is missing, /api/chat/token will fail");
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Initializing state...");
    let state = State::open(config)?;
    let listener = TcpListener::bind(addr)?;
    serve(listener, state, shutdown_signal()).await?;
    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!(%err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
