//! Runs a real Lingo server in-process for end-to-end tests.

use std::net::TcpListener;

use lingo_client::ApiClient;
use lingo_common::{OnboardingRequest, SignupRequest, User};
use lingo_server::config::Config;
use lingo_server::State;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::error;

pub const CHAT_SECRET: &str = "end-to-end-secret";

/// Server on an ephemeral port backed by a temporary database. Shut down on drop.
pub struct ServerRunner {
    base: String,
    shutdown: Option<oneshot::Sender<()>>,
    _task: JoinHandle<()>,
}

impl ServerRunner {
    pub async fn start() -> anyhow::Result<Self> {
        let config = Config {
            port: 0,
            stream_api_key: Some(String::from("end-to-end-key")),
            stream_api_secret: Some(String::from(CHAT_SECRET)),
            ..Default::default()
        };
        Self::start_with(config).await
    }

    pub async fn start_with(config: Config) -> anyhow::Result<Self> {
        let state = State::temporary(config)?;
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base = format!("http://{}/api", listener.local_addr()?);
        let (shutdown, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let signal = async {
                stopped.await.ok();
            };
            if let Err(err) = lingo_server::serve(listener, state, signal).await {
                error!(%err, "test server stopped");
            }
        });
        Ok(Self { base, shutdown: Some(shutdown), _task: task })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.base.clone())
    }

    /// Signs a user up and completes onboarding.
    pub async fn learner(&self, name: &str, native: &str, learning: &str) -> anyhow::Result<(ApiClient, User)> {
        let client = self.client();
        client
            .signup(&SignupRequest { full_name: name.to_string(), email: format!("{}@lingo.test", name.to_lowercase()) })
            .await?;
        let user = client
            .complete_onboarding(&OnboardingRequest {
                full_name: name.to_string(),
                bio: format!("{name} likes swapping languages"),
                native_language: native.to_string(),
                learning_language: learning.to_string(),
                location: String::from("Lisbon"),
            })
            .await?;
        Ok((client, user))
    }
}

impl Drop for ServerRunner {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
