// SYNOID Vision Tools
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::agent::source_tools::sanitize_filename;
use crate::error::Result;
use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use tracing::info;

/// Mean absolute pixel difference between two grayscale frames,
/// normalized to 0.0 - 1.0.
///
/// Frames of different sizes are treated as maximally different.
pub fn frame_difference(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.dimensions() != b.dimensions() {
        return 1.0;
    }

    let num_pixels = a.as_raw().len();
    if num_pixels == 0 {
        return 0.0;
    }

    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(p1, p2)| (*p1 as i32 - *p2 as i32).unsigned_abs() as u64)
        .sum();

    (total as f64 / num_pixels as f64) / 255.0
}

/// Mean pixel intensity (0 - 255).
pub fn mean_brightness(frame: &GrayImage) -> f64 {
    let raw = frame.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|p| *p as u64).sum::<u64>() as f64 / raw.len() as f64
}

pub fn is_black(frame: &GrayImage, black_threshold: u8) -> bool {
    mean_brightness(frame) < black_threshold as f64
}

/// Analysis frame size for a source of `width`x`height` scaled to
/// `target_width`, aspect preserved, both sides even.
pub fn analysis_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let w = target_width.min(width).max(2) & !1;
    let h = ((height as f64 * w as f64 / width as f64).round() as u32).max(2) & !1;
    (w, h)
}

/// Which scan produced a snapshot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSide {
    /// Leading scan: `_1` is the last static frame, `_2` the first moving one.
    Leading,
    /// Trailing scan: `_3` is the last moving frame, `_4` the first static one.
    Trailing,
}

impl SnapshotSide {
    fn indices(self) -> (u8, u8) {
        match self {
            Self::Leading => (1, 2),
            Self::Trailing => (3, 4),
        }
    }
}

pub fn snapshot_paths(dir: &Path, video_stem: &str, side: SnapshotSide) -> (PathBuf, PathBuf) {
    let stem = sanitize_filename(video_stem);
    let (a, b) = side.indices();
    (
        dir.join(format!("{}_{}.png", stem, a)),
        dir.join(format!("{}_{}.png", stem, b)),
    )
}

/// Persist the two frames flanking a detected transition for manual review.
pub fn save_transition_snapshots(
    dir: &Path,
    video_stem: &str,
    side: SnapshotSide,
    first: &DynamicImage,
    second: &DynamicImage,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let (first_path, second_path) = snapshot_paths(dir, video_stem, side);
    first.save(&first_path)?;
    second.save(&second_path)?;
    info!("[EYES] Snapshots saved: {:?}, {:?}", first_path, second_path);
    Ok((first_path, second_path))
}
