// SYNOID Splice Batch - Per-File Pipeline Driver
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Walks the video folder one file at a time: match assets, detect the
// static boundaries, render the splice. A failure at any stage is logged,
// recorded in the report and the batch moves on to the next file.

use crate::agent::asset_matcher::{find_matching_slide, pick_random_mantra, AssetCatalog};
use crate::agent::boundary_detector::{find_leading_static_end, find_trailing_static_start, BoundaryResult};
use crate::agent::frame_source::FfmpegFrameSource;
use crate::agent::io_shield::AtomicMover;
use crate::agent::source_tools::{probe_video, scan_directory_for_videos, VideoProbe};
use crate::agent::splice_plan::{SpliceLayout, SplicePlan};
use crate::agent::video_stitcher::VideoStitcher;
use crate::agent::vision_tools::SnapshotSide;
use crate::config::SpliceConfig;
use crate::error::{Result, SpliceError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Folders the batch reads from and writes to.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub videos_dir: PathBuf,
    pub slides_dir: PathBuf,
    pub mantras_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Where `<stem>_{1,2,3,4}.png` review snapshots go.
    pub snapshots_dir: PathBuf,
}

impl BatchPaths {
    /// The workflow's usual `assets/` layout under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            videos_dir: root.join("videos"),
            slides_dir: root.join("slides"),
            mantras_dir: root.join("mantras"),
            output_dir: root.join("output"),
            snapshots_dir: root.join("static_snapshots"),
        }
    }
}

/// How the intro length is decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntroMode {
    /// Scan both ends for static regions; outro mantra required.
    Detect,
    /// Replace the first N seconds with the slide; no outro.
    Fixed(f64),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Process only the video with this file name.
    pub only: Option<String>,
    /// Stop after this many successfully processed videos.
    pub limit: Option<usize>,
    /// Run detection and report boundaries without rendering.
    pub detect_only: bool,
    pub intro_mode: IntroMode,
    /// Seed for mantra selection; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            only: None,
            limit: None,
            detect_only: false,
            intro_mode: IntroMode::Detect,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Match,
    Detect,
    Splice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed {
        output: PathBuf,
        slide: PathBuf,
        mantra: Option<PathBuf>,
        intro_duration: f64,
        outro_timestamp: f64,
        layout: SpliceLayout,
        total_duration: f64,
    },
    Detected {
        duration: f64,
        intro_end: f64,
        intro_change_detected: bool,
        outro_start: f64,
        outro_change_detected: bool,
    },
    Skipped {
        stage: Stage,
        error: String,
        reason: String,
    },
    Filtered {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub video: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| {
                matches!(
                    f.outcome,
                    FileOutcome::Processed { .. } | FileOutcome::Detected { .. }
                )
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files.len() - self.processed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Skipped { .. }))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

struct StageError {
    stage: Stage,
    error: SpliceError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

/// Both boundary scans over one video.
pub struct Detection {
    pub probe: VideoProbe,
    pub leading: BoundaryResult,
    pub trailing: BoundaryResult,
}

/// Run both scans on `video`, writing review snapshots when
/// `snapshots_dir` is given.
pub async fn detect_boundaries(
    video: &Path,
    config: &SpliceConfig,
    snapshots_dir: Option<&Path>,
) -> Result<Detection> {
    let mut source = FfmpegFrameSource::open(video, config).await?;
    let leading = find_leading_static_end(&mut source, &config.detector).await?;
    let trailing = find_trailing_static_start(&mut source, &config.detector).await?;

    if let Some(dir) = snapshots_dir {
        let stem = file_stem(video);
        for (result, side) in [(&leading, SnapshotSide::Leading), (&trailing, SnapshotSide::Trailing)] {
            if let Err(e) = result.save_snapshots(&mut source, dir, &stem, side).await {
                warn!("[DETECT] Could not save snapshots for {:?}: {}", video, e);
            }
        }
    }

    Ok(Detection {
        probe: source.probe().clone(),
        leading,
        trailing,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub struct SpliceBatch<'a> {
    config: &'a SpliceConfig,
    catalog: &'a dyn AssetCatalog,
    paths: BatchPaths,
    options: BatchOptions,
}

impl<'a> SpliceBatch<'a> {
    pub fn new(
        config: &'a SpliceConfig,
        catalog: &'a dyn AssetCatalog,
        paths: BatchPaths,
        options: BatchOptions,
    ) -> Self {
        Self {
            config,
            catalog,
            paths,
            options,
        }
    }

    /// Process every video in the input folder, sequentially.
    pub async fn run(&self) -> Result<BatchReport> {
        self.config.validate()?;
        if let IntroMode::Fixed(secs) = self.options.intro_mode {
            if secs.is_nan() || secs < 0.0 {
                return Err(SpliceError::InvalidConfig(format!(
                    "fixed intro must be >= 0, got {}",
                    secs
                )));
            }
        }

        if !self.paths.videos_dir.is_dir() {
            return Err(SpliceError::InvalidConfig(format!(
                "videos folder not found: {:?}",
                self.paths.videos_dir
            )));
        }
        if !self.options.detect_only {
            if !self.paths.slides_dir.is_dir() {
                return Err(SpliceError::InvalidConfig(format!(
                    "slides folder not found: {:?}",
                    self.paths.slides_dir
                )));
            }
            if self.options.intro_mode == IntroMode::Detect && !self.paths.mantras_dir.is_dir() {
                warn!(
                    "[BATCH] Mantras folder {:?} not found; every video will be skipped",
                    self.paths.mantras_dir
                );
            }
            tokio::fs::create_dir_all(&self.paths.output_dir).await?;
        }

        let videos = scan_directory_for_videos(&self.paths.videos_dir).await?;
        if videos.is_empty() {
            warn!("[BATCH] No video files found in {:?}", self.paths.videos_dir);
        } else {
            info!("[BATCH] Found {} video(s) to process", videos.len());
        }

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut report = BatchReport::default();

        for video in videos {
            let outcome = self.process_with_timeout(&video, &mut rng, report.processed()).await;
            report.files.push(FileReport { video, outcome });
        }

        info!(
            "[BATCH] Processing complete! Successfully processed: {} | Skipped: {} | Output: {:?}",
            report.processed(),
            report.skipped(),
            self.paths.output_dir
        );
        Ok(report)
    }

    async fn process_with_timeout(
        &self,
        video: &Path,
        rng: &mut StdRng,
        processed_so_far: usize,
    ) -> FileOutcome {
        let name = file_name(video);

        if let Some(only) = &self.options.only {
            if &name != only {
                return FileOutcome::Filtered {
                    reason: format!("not '{}'", only),
                };
            }
        }
        if let Some(limit) = self.options.limit {
            if processed_so_far >= limit {
                return FileOutcome::Filtered {
                    reason: format!("limit of {} reached", limit),
                };
            }
        }

        info!("[BATCH] Processing: {}", name);
        let budget = Duration::from_secs(self.config.per_file_timeout_secs);
        let mut stage = Stage::Match;

        let result = tokio::time::timeout(budget, self.process_video(video, rng, &mut stage)).await;

        let failure = match result {
            Ok(Ok(outcome)) => {
                info!("[BATCH] ✅ Completed: {}", name);
                return outcome;
            }
            Ok(Err(e)) => e,
            Err(_) => {
                AtomicMover::discard(&AtomicMover::tmp_path_for(&self.output_path(video)));
                StageError {
                    stage,
                    error: SpliceError::unreadable(
                        video,
                        format!("timed out after {}s", budget.as_secs()),
                    ),
                }
            }
        };

        match &failure.error {
            SpliceError::MissingAsset { .. } => {
                warn!("[BATCH] {} skipped at {:?}: {}", name, failure.stage, failure.error)
            }
            _ => error!("[BATCH] ❌ {} failed at {:?}: {}", name, failure.stage, failure.error),
        }

        FileOutcome::Skipped {
            stage: failure.stage,
            error: failure.error.kind().to_string(),
            reason: failure.error.to_string(),
        }
    }

    fn output_path(&self, video: &Path) -> PathBuf {
        self.paths.output_dir.join(file_name(video))
    }

    async fn process_video(
        &self,
        video: &Path,
        rng: &mut StdRng,
        stage: &mut Stage,
    ) -> std::result::Result<FileOutcome, StageError> {
        let stem = file_stem(video);

        *stage = Stage::Match;
        let assets = if self.options.detect_only {
            None
        } else {
            let slide = find_matching_slide(self.catalog, &stem, &self.paths.slides_dir)
                .at(Stage::Match)?
                .ok_or_else(|| SpliceError::MissingAsset {
                    video: video.to_path_buf(),
                    asset: "no matching intro slide".to_string(),
                })
                .at(Stage::Match)?;

            let mantra = match self.options.intro_mode {
                IntroMode::Fixed(_) => None,
                IntroMode::Detect => {
                    let mantra = pick_random_mantra(self.catalog, &self.paths.mantras_dir, rng)
                        .at(Stage::Match)?
                        .ok_or_else(|| SpliceError::MissingAsset {
                            video: video.to_path_buf(),
                            asset: "no mantra images available".to_string(),
                        })
                        .at(Stage::Match)?;
                    info!("[MATCH] Using mantra: {:?}", mantra.file_name().unwrap_or_default());
                    Some(mantra)
                }
            };
            Some((slide, mantra))
        };

        *stage = Stage::Detect;
        let snapshots = self
            .config
            .save_snapshots
            .then_some(self.paths.snapshots_dir.as_path());

        let (probe, intro_duration, outro_timestamp) = match self.options.intro_mode {
            IntroMode::Fixed(secs) => {
                let probe = probe_video(&self.config.ffprobe_bin, video)
                    .await
                    .at(Stage::Detect)?;
                let duration = probe.duration;
                (probe, secs, duration)
            }
            IntroMode::Detect => {
                let detection = detect_boundaries(video, self.config, snapshots)
                    .await
                    .at(Stage::Detect)?;
                info!(
                    "[DETECT] {}: intro ends {:.2}s, outro starts {:.2}s (duration {:.2}s)",
                    stem,
                    detection.leading.timestamp,
                    detection.trailing.timestamp,
                    detection.probe.duration
                );

                if self.options.detect_only {
                    return Ok(FileOutcome::Detected {
                        duration: detection.probe.duration,
                        intro_end: detection.leading.timestamp,
                        intro_change_detected: detection.leading.change_detected,
                        outro_start: detection.trailing.timestamp,
                        outro_change_detected: detection.trailing.change_detected,
                    });
                }
                (
                    detection.probe,
                    detection.leading.timestamp,
                    detection.trailing.timestamp,
                )
            }
        };

        let Some((slide, mantra)) = assets else {
            return Ok(FileOutcome::Detected {
                duration: probe.duration,
                intro_end: intro_duration,
                intro_change_detected: false,
                outro_start: outro_timestamp,
                outro_change_detected: false,
            });
        };

        *stage = Stage::Splice;
        let plan = SplicePlan::build(
            probe.duration,
            intro_duration,
            outro_timestamp,
            &slide,
            mantra.as_deref(),
        );
        let output = self.output_path(video);
        VideoStitcher::new(&self.config.ffmpeg_bin, &self.config.encoder)
            .render(video, &plan, &probe, &output)
            .await
            .at(Stage::Splice)?;

        Ok(FileOutcome::Processed {
            output,
            slide,
            mantra,
            intro_duration,
            outro_timestamp,
            layout: plan.layout,
            total_duration: plan.total_duration(),
        })
    }
}
