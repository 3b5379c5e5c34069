//! Parley server - main entry point.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_core::ParleyConfig;
use parley_server::{AppState, router};

/// Environment variable naming an optional TOML config file.
const ENV_CONFIG: &str = "PARLEY_CONFIG";
/// Set to `json` for one JSON object per log line.
const ENV_LOG_FORMAT: &str = "PARLEY_LOG_FORMAT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Prefer local overrides.
    let env_failures = load_env_files(&[Path::new(".env.local"), Path::new(".env")]);

    let json_logs = is_json_format(std::env::var(ENV_LOG_FORMAT).ok().as_deref());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_server=info,parley_core=info,tower_http=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    for (path, error) in env_failures {
        tracing::warn!(file = %path.display(), %error, "Failed to load env file");
    }

    let config = load_config()?;
    tracing::info!(
        bind = %config.server.bind,
        keep = config.retention.keep,
        window = config.memory.window_size,
        cleanup_enabled = config.server.cleanup_secret.is_some(),
        "Starting Parley server"
    );

    let bind = config.server.bind.clone();
    let app = router(Arc::new(AppState::from_config(config)));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("Listening on {}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load each existing file into the environment. Returns the files that
/// exist but could not be loaded; logging is not up yet at this point.
fn load_env_files<'a>(paths: &[&'a Path]) -> Vec<(&'a Path, dotenvy::Error)> {
    paths
        .iter()
        .filter(|path| path.exists())
        .filter_map(|path| dotenvy::from_path(path).err().map(|e| (*path, e)))
        .collect()
}

fn is_json_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

fn load_config() -> anyhow::Result<ParleyConfig> {
    let mut config = match std::env::var(ENV_CONFIG) {
        Ok(path) => ParleyConfig::from_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {path}"))?,
        Err(_) => ParleyConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}
