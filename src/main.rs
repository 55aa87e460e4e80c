// SYNOID Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_splice::agent::asset_matcher::FsCatalog;
use synoid_splice::agent::batch::{
    detect_boundaries, BatchOptions, BatchPaths, IntroMode, SpliceBatch,
};
use synoid_splice::agent::health;
use synoid_splice::agent::source_tools::probe_video;
use synoid_splice::config::SpliceConfig;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synoid-splice")]
#[command(about = "SYNOID Slide Splicer: swap static intros and outros for slides", long_about = None)]
struct Cli {
    /// JSON config file overriding the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every video in the input folder
    Run {
        /// Root folder holding videos/, slides/, mantras/
        #[arg(long, default_value = "assets")]
        assets: PathBuf,

        /// Input videos folder (default: <assets>/videos)
        #[arg(long)]
        videos: Option<PathBuf>,

        /// Intro slides folder (default: <assets>/slides)
        #[arg(long)]
        slides: Option<PathBuf>,

        /// Outro mantra images folder (default: <assets>/mantras)
        #[arg(long)]
        mantras: Option<PathBuf>,

        /// Output folder (default: <assets>/output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Review snapshot folder (default: <assets>/static_snapshots)
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Only process the video with this file name
        #[arg(long)]
        only: Option<String>,

        /// Stop after this many processed videos
        #[arg(long)]
        limit: Option<usize>,

        /// Detect boundaries and report them without rendering
        #[arg(long)]
        detect_only: bool,

        /// Replace the first N seconds with the slide and skip the outro
        #[arg(long)]
        fixed_intro: Option<f64>,

        /// Seed for mantra selection
        #[arg(long)]
        seed: Option<u64>,

        /// Write the batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Find the static intro and outro of one video
    Detect {
        /// Input video path
        #[arg(short, long)]
        input: PathBuf,

        /// Save transition snapshots to this folder
        #[arg(long)]
        snapshots: Option<PathBuf>,
    },

    /// Print duration, size and frame rate of a video
    Probe {
        /// Input video path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are callable
    Check,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SpliceConfig> {
    let config = match path {
        Some(p) => SpliceConfig::load(p).with_context(|| format!("loading config {:?}", p))?,
        None => SpliceConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = load_config(args.config.as_deref())?;

    info!("--- SYNOID SLIDE SPLICER v{} ---", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Run {
            assets,
            videos,
            slides,
            mantras,
            output,
            snapshots,
            only,
            limit,
            detect_only,
            fixed_intro,
            seed,
            report,
        } => {
            let missing = health::missing(&health::check_dependencies(&config).await);
            if !missing.is_empty() {
                bail!("required tools not found: {}", missing.join(", "));
            }

            let defaults = BatchPaths::under(&assets);
            let paths = BatchPaths {
                videos_dir: videos.unwrap_or(defaults.videos_dir),
                slides_dir: slides.unwrap_or(defaults.slides_dir),
                mantras_dir: mantras.unwrap_or(defaults.mantras_dir),
                output_dir: output.unwrap_or(defaults.output_dir),
                snapshots_dir: snapshots.unwrap_or(defaults.snapshots_dir),
            };
            let options = BatchOptions {
                only,
                limit,
                detect_only,
                intro_mode: fixed_intro.map_or(IntroMode::Detect, IntroMode::Fixed),
                seed,
            };

            let catalog = FsCatalog;
            let batch = SpliceBatch::new(&config, &catalog, paths, options);
            let summary = batch.run().await?;

            for failure in summary.failures() {
                warn!("[BATCH] Skipped {:?}", failure.video);
            }
            println!(
                "Processed: {} | Skipped: {}",
                summary.processed(),
                summary.skipped()
            );

            if let Some(report_path) = report {
                summary
                    .write_json(&report_path)
                    .with_context(|| format!("writing report {:?}", report_path))?;
                info!("[BATCH] Report written to {:?}", report_path);
            }
        }
        Commands::Detect { input, snapshots } => {
            let detection = detect_boundaries(&input, &config, snapshots.as_deref()).await?;
            let json = serde_json::json!({
                "video": input,
                "probe": detection.probe,
                "leading": detection.leading,
                "trailing": detection.trailing,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Probe { input } => {
            let probe = probe_video(&config.ffprobe_bin, &input).await?;
            println!("{}", serde_json::to_string_pretty(&probe)?);
        }
        Commands::Check => {
            let report = health::check_dependencies(&config).await;
            for tool in &report {
                match &tool.version {
                    Some(v) => println!("{:<10} OK  {}", tool.name, v),
                    None => println!("{:<10} MISSING", tool.name),
                }
            }
            let missing = health::missing(&report);
            if !missing.is_empty() {
                error!("Missing dependencies: {:?}", missing);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
