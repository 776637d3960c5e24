use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lemco_core::config::{DEFAULT_OUTPUT_DIR, DEFAULT_REMOTE_PREFIX, DEFAULT_SOURCE};
use lemco_core::{
    LocalLayout, Pipeline, PipelineConfig, PipelineError, RemoteConfig, StoreKind, Uploader,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lemco logistics ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the logistics extract, split it into a star schema and publish the tables
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Source CSV extract
    #[arg(long, default_value = DEFAULT_SOURCE)]
    input: PathBuf,
    /// Directory for the local CSV copies
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
    /// Key prefix for uploaded Parquet objects
    #[arg(long, default_value = DEFAULT_REMOTE_PREFIX)]
    prefix: String,
    /// Object store backend
    #[arg(long, env = "LEMCO_OBJECT_STORE_KIND", default_value_t = StoreKind::Azure)]
    store: StoreKind,
    /// Write local files only
    #[arg(long)]
    skip_upload: bool,
    /// Cancel outstanding uploads after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
}

impl RunArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source: self.input.clone(),
            layout: LocalLayout::new(&self.output_dir),
            remote_prefix: self.prefix.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args).await,
    }
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut pipeline = Pipeline::new(args.pipeline_config());

    if args.skip_upload {
        info!("Skipping upload at user request");
    } else {
        let uploader = connect_uploader(args.store, cancel.clone())
            .await
            .map_err(report)?;
        pipeline = pipeline.with_uploader(uploader);
    }

    spawn_ctrl_c(cancel.clone());
    if let Some(secs) = args.deadline_secs {
        spawn_deadline(cancel.clone(), Duration::from_secs(secs));
    }

    let outcome = pipeline.run().await;
    cancel.cancel();

    let summary = outcome.map_err(report)?;
    let rendered = serde_json::to_string(&summary).context("failed to render run summary")?;
    info!(summary = %rendered, "lemco run complete");
    Ok(())
}

async fn connect_uploader(kind: StoreKind, cancel: CancellationToken) -> Result<Uploader, PipelineError> {
    let remote = RemoteConfig::from_env(kind)?;
    let store = remote.connect().await?;
    info!(store = %store.describe(), "object store ready");
    Ok(Uploader::new(store, cancel))
}

fn report(err: PipelineError) -> anyhow::Error {
    error!(stage = %err.stage(), error = %err, "lemco run failed");
    anyhow::Error::new(err).context("lemco run failed")
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("interrupt received, cancelling outstanding uploads");
                    cancel.cancel();
                }
            }
        }
    });
}

fn spawn_deadline(cancel: CancellationToken, deadline: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                warn!(deadline_secs = deadline.as_secs(), "deadline reached, cancelling outstanding uploads");
                cancel.cancel();
            }
        }
    });
}
