//! Session Gate - credential and session service
//! Mission: Register users, hand out session tokens, and guard protected routes

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use session_gate::{
    auth::{clock::SystemClock, jwt::MIN_RECOMMENDED_SECRET_LEN},
    build_router, AppState, Args, Config,
};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let args = Args::parse();
    let config = Config::from_args(args)?;

    if config.signing_secret.is_weak() {
        warn!(
            min_len = MIN_RECOMMENDED_SECRET_LEN,
            "Signing secret is the development default or too short; set JWT_SECRET in production"
        );
    }
    if !config.cookies.secure {
        warn!("Session cookie is sent without the Secure flag");
    }

    let state = AppState::build(&config, Arc::new(SystemClock))?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also the crate root, when running with --manifest-path from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
