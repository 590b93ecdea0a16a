//! Host server entry point.
//!
//! Serves the line-delimited JSON protocol that a chat front-end uses to run
//! one game per user.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use chat_tetris::adapter::{run_server, ServerConfig};
use chat_tetris::session::SessionRegistry;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address (overrides TETRIS_BOT_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides TETRIS_BOT_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Live games allowed at once (overrides TETRIS_BOT_MAX_SESSIONS)
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Seconds without input before a game is abandoned (overrides TETRIS_BOT_IDLE_SECS)
    #[arg(long)]
    idle_secs: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_sessions) = self.max_sessions {
            config.max_sessions = max_sessions;
        }
        if let Some(secs) = self.idle_secs {
            config.idle_timeout = std::time::Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    args.apply(&mut config);

    let registry = SessionRegistry::with_config(config.session_config());
    info!(
        max_sessions = config.max_sessions,
        idle_secs = config.idle_timeout.as_secs(),
        "starting chat-tetris"
    );

    tokio::select! {
        result = run_server(config, registry.clone(), None) => result?,
        _ = tokio::signal::ctrl_c() => {
            let summaries = registry.end_all().await;
            info!(ended = summaries.len(), "shutting down");
        }
    }

    Ok(())
}
