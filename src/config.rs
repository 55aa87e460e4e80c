// SYNOID Splice Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every tunable of the detect → match → splice pipeline lives here. The
// defaults are the values the publishing workflow has always used; a JSON
// file can override any subset of them.

use crate::error::{Result, SpliceError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment override for the ffmpeg binary.
pub const FFMPEG_ENV: &str = "SYNOID_FFMPEG";
/// Environment override for the ffprobe binary.
pub const FFPROBE_ENV: &str = "SYNOID_FFPROBE";

/// Static-region detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Normalized mean absolute difference (0-1) above which two samples
    /// count as motion.
    pub diff_threshold: f64,
    /// Seconds between sampled frames.
    pub sample_interval: f64,
    /// Mean brightness (0-255) below which a frame is treated as black.
    pub black_threshold: u8,
    /// Intro length reported when the leading scan never sees motion.
    pub fallback_intro_secs: f64,
    /// Subtracted from the trailing boundary.
    pub trailing_margin_secs: f64,
    /// Frames are downscaled to this width before comparison.
    pub analysis_width: u32,
    /// Length of each decode window.
    pub scan_window_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 0.01,
            sample_interval: 0.1,
            black_threshold: 20,
            fallback_intro_secs: 5.0,
            trailing_margin_secs: 0.1,
            analysis_width: 320,
            scan_window_secs: 30.0,
        }
    }
}

/// Fixed output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub pixel_format: String,
    pub threads: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
            threads: 6,
        }
    }
}

/// Top-level configuration passed into every pipeline operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpliceConfig {
    pub detector: DetectorConfig,
    pub encoder: EncoderConfig,
    /// Wall-clock budget for one video (detect + splice).
    pub per_file_timeout_secs: u64,
    /// Write `<stem>_{1,2,3,4}.png` around detected transitions.
    pub save_snapshots: bool,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            encoder: EncoderConfig::default(),
            per_file_timeout_secs: 900,
            save_snapshots: true,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl SpliceConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SpliceConfig = serde_json::from_str(&raw)?;
        info!("[CONFIG] Loaded {:?}", path);
        config.validate()?;
        Ok(config)
    }

    /// Apply `SYNOID_FFMPEG` / `SYNOID_FFPROBE` if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bin) = std::env::var(FFMPEG_ENV) {
            if !bin.trim().is_empty() {
                self.ffmpeg_bin = bin;
            }
        }
        if let Ok(bin) = std::env::var(FFPROBE_ENV) {
            if !bin.trim().is_empty() {
                self.ffprobe_bin = bin;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if !(d.diff_threshold > 0.0 && d.diff_threshold < 1.0) {
            return Err(SpliceError::InvalidConfig(format!(
                "diff_threshold must be in (0, 1), got {}",
                d.diff_threshold
            )));
        }
        if !(d.sample_interval > 0.0) {
            return Err(SpliceError::InvalidConfig(format!(
                "sample_interval must be > 0, got {}",
                d.sample_interval
            )));
        }
        if d.fallback_intro_secs < 0.0 || d.trailing_margin_secs < 0.0 {
            return Err(SpliceError::InvalidConfig(
                "fallback_intro_secs and trailing_margin_secs must be >= 0".to_string(),
            ));
        }
        if d.analysis_width < 2 {
            return Err(SpliceError::InvalidConfig(format!(
                "analysis_width must be >= 2, got {}",
                d.analysis_width
            )));
        }
        if d.scan_window_secs < d.sample_interval {
            return Err(SpliceError::InvalidConfig(format!(
                "scan_window_secs ({}) must cover at least one sample_interval ({})",
                d.scan_window_secs, d.sample_interval
            )));
        }
        if self.per_file_timeout_secs == 0 {
            return Err(SpliceError::InvalidConfig(
                "per_file_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.ffmpeg_bin.trim().is_empty() || self.ffprobe_bin.trim().is_empty() {
            return Err(SpliceError::InvalidConfig(
                "ffmpeg_bin and ffprobe_bin must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
