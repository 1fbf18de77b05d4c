//! Hotel booking inference server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hotel_inference::artifact::{load_model, ArtifactStore, LocalArtifactStore};
use hotel_inference::config::{ArtifactSource, Settings};
use hotel_inference::server::{self, AppState};
use hotel_inference::service::PredictionService;

#[derive(Parser, Debug)]
#[command(name = "hotel-inference", version, about = "Score hotel bookings over HTTP")]
struct Cli {
    /// TOML settings file.
    #[arg(short, long, env = "HOTEL_INFERENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on; overrides the settings.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() {
    // .env values win over the inherited environment.
    let dotenv = dotenvy::dotenv_override();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Ok(path) = &dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(bind) = cli.bind {
        settings.server.bind = bind;
    }

    let store = artifact_store(&settings).await?;
    let location = settings.artifact.location();
    let model = load_model(
        store.as_ref(),
        &location,
        &settings.artifact.staging_dir,
        &settings.artifact.materialize_options(),
    )
    .await
    .with_context(|| format!("failed to load model from {location}"))?;

    let service = PredictionService::new(Arc::new(model), settings.encoding);
    server::serve(settings.server.bind, AppState::new(service))
        .await
        .context("server error")?;
    Ok(())
}

async fn artifact_store(settings: &Settings) -> anyhow::Result<Box<dyn ArtifactStore>> {
    match settings.artifact.source {
        ArtifactSource::Local => Ok(Box::new(LocalArtifactStore::new(&settings.artifact.local_root))),
        #[cfg(feature = "s3")]
        ArtifactSource::S3 => Ok(Box::new(
            hotel_inference::artifact::S3ArtifactStore::from_credentials(&settings.aws).await,
        )),
        #[cfg(not(feature = "s3"))]
        ArtifactSource::S3 => anyhow::bail!("built without S3 support; set artifact.source = \"local\""),
    }
}
