//! Portrait clip orchestrator CLI.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use portrait_core::{Orchestrator, OrchestratorConfig, OrchestratorError};
use portrait_models::{ApplicationState, JobPhase};
use portrait_queue::QueueConfig;

#[derive(Parser)]
#[command(name = "portrait")]
#[command(about = "Turn a source video into portrait clips through the job queue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Job queue base URL
    #[arg(long, global = true, env = "PORTRAIT_QUEUE_URL")]
    queue_url: Option<String>,

    /// Client identifier sent with processing jobs; random per run if unset
    #[arg(long, global = true, env = "PORTRAIT_CLIENT_UUID")]
    uuid: Option<String>,

    /// Print the final state as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the qualities a source video is available in
    Resolutions {
        /// Source video URL
        url: String,
    },

    /// Generate clips from a source video
    Generate {
        /// Source video URL
        url: String,

        /// Quality to process; defaults to the best one offered
        #[arg(short, long)]
        resolution: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let orchestrator = Orchestrator::from_config(config)?;

    let result = match &cli.command {
        Commands::Resolutions { url } => resolutions(&orchestrator, url, cli.json).await,
        Commands::Generate { url, resolution } => {
            generate(&orchestrator, url, resolution.as_deref(), cli.json).await
        }
    };

    orchestrator.shutdown().await;
    result
}

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive("portrait=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<OrchestratorConfig> {
    let mut config = OrchestratorConfig::from_env().context("Invalid configuration")?;

    if let Some(url) = &cli.queue_url {
        let queue = QueueConfig {
            request_timeout: config.queue.request_timeout,
            connect_timeout: config.queue.connect_timeout,
            ..QueueConfig::new(url.as_str())
        };
        config.default_video = queue.default_video_url();
        config.queue = queue;
    }
    if let Some(uuid) = &cli.uuid {
        config = config.with_client_uuid(uuid.as_str());
    }
    if config.client_uuid.is_none() {
        config = config.with_client_uuid(Uuid::new_v4().to_string());
    }

    Ok(config)
}

async fn discover(orchestrator: &Orchestrator, url: &str) -> Result<ApplicationState> {
    info!(url = %url, "Discovering resolutions");
    orchestrator.on_url_change(url)?;
    let state = orchestrator.wait_for_resolutions(url).await?;

    if state.resolution_job.phase == JobPhase::Failed {
        let reason = state
            .last_failure
            .as_ref()
            .map(|f| f.reason.as_str())
            .unwrap_or("unknown error");
        bail!("Resolution discovery failed: {}", reason);
    }

    Ok(state)
}

async fn resolutions(orchestrator: &Orchestrator, url: &str, json: bool) -> Result<()> {
    let state = discover(orchestrator, url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else if state.available_resolutions.is_empty() {
        println!("No resolutions available");
    } else {
        for label in &state.available_resolutions {
            println!("{}", label);
        }
    }

    Ok(())
}

async fn generate(
    orchestrator: &Orchestrator,
    url: &str,
    resolution: Option<&str>,
    json: bool,
) -> Result<()> {
    let state = discover(orchestrator, url).await?;

    let resolution = match resolution {
        Some(label) if state.available_resolutions.iter().any(|r| r == label) => {
            orchestrator.on_resolution_change(label)?;
            label.to_string()
        }
        Some(label) => bail!(
            "Resolution {} is not offered (available: {})",
            label,
            state.available_resolutions.join(", ")
        ),
        None => state
            .selected_resolution
            .clone()
            .context("No resolutions available for this video")?,
    };

    let handle = orchestrator.on_generate(url, &resolution).await?;
    info!(task_id = %handle.id, resolution = %resolution, "Processing started");

    let outcome = tokio::select! {
        outcome = orchestrator.wait_for_outcome(&handle) => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, cancelling job");
            match orchestrator.on_cancel().await {
                Ok(_) => {}
                Err(OrchestratorError::CancelFailed(reason)) => {
                    warn!(reason = %reason, "Queue did not confirm the cancellation");
                }
                Err(e) => return Err(e.into()),
            }
            Err(OrchestratorError::Cancelled)
        }
    };

    let state = match outcome {
        Ok(state) => state,
        Err(OrchestratorError::Cancelled) => {
            println!("Cancelled");
            return Ok(());
        }
        Err(e) => return Err(e).context("Processing did not finish"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    for video in &state.generated_videos {
        println!("{}", video);
    }
    if let Some(current) = &state.current_video {
        let marker = if state.current_video_confirmed_playable {
            "playable"
        } else {
            "unconfirmed"
        };
        println!("current: {} ({})", current, marker);
    }

    Ok(())
}
