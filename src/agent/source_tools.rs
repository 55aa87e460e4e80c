// SYNOID Source Tools - Media Probing & Input Discovery
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// This module handles:
// 1. Stream metadata (duration, frame size, fps, audio) via ffprobe
// 2. Directory scanning for source videos
// 3. Argument/filename hygiene for external tools

use crate::error::{Result, SpliceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Source video extensions accepted by the batch (compared case-insensitively).
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];

const PROBE_TIMEOUT_SECS: u64 = 10;

/// What the pipeline needs to know about a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProbe {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

/// Prefix paths that start with '-' so ffmpeg does not read them as flags.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Remove characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}

/// Parse an ffprobe rational such as `30000/1001` or `25`.
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Build a `VideoProbe` from `ffprobe -print_format json -show_format -show_streams`.
pub fn parse_probe_json(raw: &str) -> Option<VideoProbe> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let streams = value.get("streams")?.as_array()?;

    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))?;
    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));

    let width = video.get("width")?.as_u64()? as u32;
    let height = video.get("height")?.as_u64()? as u32;

    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(|v| v.as_str()))
        .find_map(parse_rate)?;

    let duration = value
        .get("format")
        .and_then(|f| f.get("duration"))
        .or_else(|| video.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)?;

    Some(VideoProbe {
        duration,
        width,
        height,
        fps,
        has_audio,
    })
}

/// Probe a video with ffprobe under a short timeout.
pub async fn probe_video(ffprobe: &str, path: &Path) -> Result<VideoProbe> {
    let safe_path = safe_arg_path(path);

    let output = tokio::time::timeout(
        tokio::time::Duration::from_secs(PROBE_TIMEOUT_SECS),
        Command::new(ffprobe)
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&safe_path)
            .output(),
    )
    .await
    .map_err(|_| SpliceError::unreadable(path, "ffprobe timed out"))?
    .map_err(|e| SpliceError::unreadable(path, format!("failed to run {}: {}", ffprobe, e)))?;

    if !output.status.success() {
        return Err(SpliceError::unreadable(
            path,
            format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let probe = parse_probe_json(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| SpliceError::unreadable(path, "no decodable video stream"))?;

    debug!(
        "[PROBE] {:?}: {:.2}s {}x{} @ {:.3} fps (audio: {})",
        path, probe.duration, probe.width, probe.height, probe.fps, probe.has_audio
    );
    Ok(probe)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Scan a directory (non-recursive) for source videos, sorted by name.
pub async fn scan_directory_for_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && has_extension(&path, &VIDEO_EXTENSIONS) {
            videos.push(path);
        }
    }

    videos.sort();
    info!("[SOURCE] Found {} video(s) in {:?}", videos.len(), dir);
    Ok(videos)
}
