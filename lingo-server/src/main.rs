use std::env;

use lingo_server::config::Config;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut config = Config::load();
    if let Some(port) = env::args().nth(1) {
        config.port = port.parse()?;
    }
    lingo_server::start_server(config).await
}
