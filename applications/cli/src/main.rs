/// Encore - headless preview player
use anyhow::Context;
use clap::{Parser, Subcommand};
use encore_cli::commands::{self, PlayArgs, PreviewArgs, SpectrumArgs};
use encore_cli::{AppConfig, Reporter};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "encore=info,encore_cli=info,encore_playback=info,encore_decoder=info";

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Preview, queue and visualize a local music folder", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./encore.toml when present)
    #[arg(short, long, global = true, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview every track in a folder back to back
    Preview {
        /// Folder to ingest
        dir: PathBuf,
        /// Preview window start (seconds)
        #[arg(long)]
        start_sec: Option<f64>,
        /// Preview window end (seconds)
        #[arg(long)]
        end_sec: Option<f64>,
        /// Stop after this many previews
        #[arg(long)]
        limit: Option<usize>,
        /// Render as fast as possible instead of in real time
        #[arg(long)]
        fast: bool,
    },
    /// Play tracks in full through the queue
    Play {
        /// Folder to ingest
        dir: PathBuf,
        /// Comma-separated file names to queue, e.g. "intro,outro"
        #[arg(short, long)]
        queue: Option<String>,
        /// Render as fast as possible instead of in real time
        #[arg(long)]
        fast: bool,
    },
    /// Render spectrum frames of a file to PNG
    Spectrum {
        /// Audio file
        file: PathBuf,
        /// Position of the first frame (seconds)
        #[arg(long, default_value_t = 0.0)]
        at: f64,
        /// Number of frames
        #[arg(long, default_value_t = 1)]
        frames: usize,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Square-cell layout
        #[arg(long)]
        square: bool,
        /// Output PNG (numbered when rendering several frames)
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let reporter = Reporter::new(cli.json);

    match cli.command {
        Commands::Preview {
            dir,
            start_sec,
            end_sec,
            limit,
            fast,
        } => {
            let args = PreviewArgs {
                dir,
                start_sec,
                end_sec,
                limit,
                fast,
            };
            commands::preview(config, args, reporter)
                .await
                .context("Preview failed")?;
        }
        Commands::Play { dir, queue, fast } => {
            let args = PlayArgs { dir, queue, fast };
            commands::play(config, args, reporter)
                .await
                .context("Playback failed")?;
        }
        Commands::Spectrum {
            file,
            at,
            frames,
            width,
            height,
            square,
            out,
        } => {
            let args = SpectrumArgs {
                file,
                at,
                frames,
                width,
                height,
                square,
                out,
            };
            commands::spectrum(config, args, reporter)
                .await
                .context("Spectrum rendering failed")?;
        }
    }

    Ok(())
}
