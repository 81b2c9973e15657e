//! vodhub server binary.
//!
//! Usage: `vodhub [CONFIG]`. Without an argument the config is read from
//! `$VODHUB_CONFIG` or the user config directory; a missing default file
//! means built-in defaults.

use std::path::PathBuf;

use vodhub::{VodhubConfig, VodhubServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    if config.sources.is_empty() {
        tracing::warn!("no sources configured; searches will answer 503");
    }

    let server = VodhubServer::start(&config)
        .await
        .map_err(|e| anyhow::anyhow!("vodhub failed to start: {e}"))?;
    tracing::info!(port = server.port(), "vodhub started");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    tracing::info!("vodhub shut down cleanly");
    Ok(())
}

fn load_config() -> anyhow::Result<VodhubConfig> {
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        tracing::info!(path = %path.display(), "loading config");
        return Ok(VodhubConfig::from_file(&path)?);
    }

    let path = VodhubConfig::default_config_path();
    if path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        Ok(VodhubConfig::from_file(&path)?)
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Ok(VodhubConfig::default())
    }
}
