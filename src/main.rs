//! claim-verifier binary
//!
//! Usage:
//!   claim-verifier [serve]
//!   claim-verifier check "<claim>"

use anyhow::{bail, Context};
use claim_verifier::{
    api::{build_router, AppState},
    logging, Verifier, VerifierConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn config_path() -> Option<PathBuf> {
    match std::env::var("CLAIM_VERIFIER_CONFIG") {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let path = config_path();
    let config = VerifierConfig::load(path.as_deref()).context("Failed to load configuration")?;
    logging::init_tracing(&config.logging)?;

    if let Some(path) = &path {
        info!(path = %path.display(), "Configuration loaded");
    }

    let verifier = Arc::new(Verifier::from_config(&config).context("Failed to build verifier")?);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => serve(&config, verifier).await,
        Some("check") => {
            let claim = args.collect::<Vec<_>>().join(" ");
            if claim.trim().is_empty() {
                bail!("usage: claim-verifier check \"<claim>\"");
            }

            let result = verifier.verify(claim.trim()).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Some(other) => bail!("unknown command '{}', expected 'serve' or 'check'", other),
    }
}

async fn serve(config: &VerifierConfig, verifier: Arc<Verifier>) -> anyhow::Result<()> {
    let state = AppState {
        verifier,
        max_claim_chars: config.server.max_claim_chars,
    };
    let router = build_router(state, config.server.body_limit_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}
