// SYNOID Boundary Detector - Static Intro/Outro Detection
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Finds where the held title image at the start of a video gives way to
// motion, and where motion settles into the closing still at the end.
// Both scans compare consecutive samples on a fixed time grid
// (t_k = k * sample_interval) using the normalized mean absolute
// grayscale difference.

use crate::agent::frame_source::{Frame, FrameSource};
use crate::agent::vision_tools::{frame_difference, is_black, save_transition_snapshots, SnapshotSide};
use crate::config::DetectorConfig;
use crate::error::Result;
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The two samples on either side of a detected transition, in time order.
#[derive(Debug, Clone)]
pub struct TransitionFrames {
    pub earlier: Frame,
    pub later: Frame,
}

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryResult {
    /// Boundary in seconds, within `[0, duration]`.
    pub timestamp: f64,
    /// `false` when the scan fell back to its default.
    pub change_detected: bool,
    /// Set by the trailing scan when the video fades to black.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_end: Option<f64>,
    #[serde(skip)]
    pub transition: Option<TransitionFrames>,
}

impl BoundaryResult {
    fn fallback(timestamp: f64) -> Self {
        Self {
            timestamp,
            change_detected: false,
            effective_end: None,
            transition: None,
        }
    }

    /// Write the flanking frames as `<stem>_{1,2}.png` (leading) or
    /// `<stem>_{3,4}.png` (trailing). Full-colour frames are taken from
    /// `source` when it can decode them; otherwise the analysis frames are
    /// written. No-op when nothing was detected.
    pub async fn save_snapshots<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        dir: &Path,
        video_stem: &str,
        side: SnapshotSide,
    ) -> Result<Option<(PathBuf, PathBuf)>> {
        let Some(t) = &self.transition else {
            return Ok(None);
        };
        let earlier = review_frame(source, &t.earlier).await;
        let later = review_frame(source, &t.later).await;
        save_transition_snapshots(dir, video_stem, side, &earlier, &later).map(Some)
    }
}

async fn review_frame<S: FrameSource + ?Sized>(source: &mut S, frame: &Frame) -> DynamicImage {
    match source.snapshot(frame.timestamp).await {
        Ok(Some(rgb)) => DynamicImage::ImageRgb8(rgb),
        Ok(None) => DynamicImage::ImageLuma8(frame.image.clone()),
        Err(e) => {
            debug!("[EYES] Colour snapshot at {:.2}s unavailable: {}", frame.timestamp, e);
            DynamicImage::ImageLuma8(frame.image.clone())
        }
    }
}

/// Number of grid samples strictly inside `[0, duration)`.
pub fn sample_count(duration: f64, step: f64) -> usize {
    if !(duration > 0.0) || !(step > 0.0) {
        return 0;
    }
    ((duration / step) - 1e-9).ceil().max(0.0) as usize
}

fn window_len(config: &DetectorConfig) -> usize {
    ((config.scan_window_secs / config.sample_interval).round() as usize).max(1)
}

/// Yields grid samples from the end of the video towards the start,
/// decoding one window at a time.
struct BackwardScan {
    next_hi: usize,
    window: usize,
    step: f64,
    buffer: Vec<Frame>,
}

impl BackwardScan {
    fn new(total: usize, window: usize, step: f64) -> Self {
        Self {
            next_hi: total,
            window,
            step,
            buffer: Vec::new(),
        }
    }

    async fn next<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<Option<Frame>> {
        while self.buffer.is_empty() {
            if self.next_hi == 0 {
                return Ok(None);
            }
            let lo = self.next_hi.saturating_sub(self.window);
            let count = self.next_hi - lo;
            self.buffer = source.sample(lo as f64 * self.step, self.step, count).await?;
            self.next_hi = lo;
        }
        Ok(self.buffer.pop())
    }
}

/// Forward scan: the first sample whose difference from its predecessor
/// exceeds `diff_threshold` marks the end of the leading still.
///
/// Falls back to `fallback_intro_secs` (clamped to the duration) when the
/// whole video is static.
pub async fn find_leading_static_end<S: FrameSource + ?Sized>(
    source: &mut S,
    config: &DetectorConfig,
) -> Result<BoundaryResult> {
    let duration = source.duration();
    let step = config.sample_interval;
    let total = sample_count(duration, step);
    let window = window_len(config);

    let mut prev: Option<Frame> = None;
    let mut k = 0;

    while k < total {
        let count = window.min(total - k);
        let frames = source.sample(k as f64 * step, step, count).await?;
        let short_read = frames.len() < count;

        for frame in frames {
            if let Some(before) = prev.take() {
                let diff = frame_difference(&before.image, &frame.image);
                if diff > config.diff_threshold {
                    info!(
                        "[DETECT] Leading still ends at {:.2}s (diff {:.4})",
                        frame.timestamp, diff
                    );
                    return Ok(BoundaryResult {
                        timestamp: frame.timestamp.clamp(0.0, duration),
                        change_detected: true,
                        effective_end: None,
                        transition: Some(TransitionFrames {
                            earlier: before,
                            later: frame,
                        }),
                    });
                }
            }
            prev = Some(frame);
        }

        if short_read {
            break;
        }
        k += count;
    }

    let fallback = config.fallback_intro_secs.min(duration).max(0.0);
    info!(
        "[DETECT] No change detected in leading frames; using {:.2}s fallback",
        fallback
    );
    Ok(BoundaryResult::fallback(fallback))
}

/// Backward scan: skips a black tail, then walks back from the effective
/// end until motion appears. The boundary is the earliest static sample
/// minus `trailing_margin_secs`. A video with no motion returns 0.
pub async fn find_trailing_static_start<S: FrameSource + ?Sized>(
    source: &mut S,
    config: &DetectorConfig,
) -> Result<BoundaryResult> {
    let duration = source.duration();
    let step = config.sample_interval;
    let total = sample_count(duration, step);
    let mut scan = BackwardScan::new(total, window_len(config), step);

    let mut prev = match scan.next(source).await? {
        Some(frame) => frame,
        None => {
            info!("[DETECT] No decodable frames; treating video as static");
            return Ok(BoundaryResult::fallback(0.0));
        }
    };

    let mut effective_end = None;
    if is_black(&prev.image, config.black_threshold) {
        let black_from = prev.timestamp;
        loop {
            match scan.next(source).await? {
                Some(frame) if is_black(&frame.image, config.black_threshold) => continue,
                Some(frame) => {
                    debug!(
                        "[DETECT] Black tail skipped; content ends at {:.2}s (last sample {:.2}s)",
                        frame.timestamp, black_from
                    );
                    effective_end = Some(frame.timestamp);
                    prev = frame;
                    break;
                }
                None => {
                    info!("[DETECT] Every sample is black; treating video as static");
                    return Ok(BoundaryResult::fallback(0.0));
                }
            }
        }
    }

    let mut static_start = prev.timestamp;

    while let Some(frame) = scan.next(source).await? {
        let diff = frame_difference(&frame.image, &prev.image);
        if diff > config.diff_threshold {
            let boundary = (static_start - config.trailing_margin_secs).clamp(0.0, duration);
            info!(
                "[DETECT] Trailing still starts at {:.2}s ({:.2}s before end, diff {:.4})",
                boundary,
                duration - boundary,
                diff
            );
            return Ok(BoundaryResult {
                timestamp: boundary,
                change_detected: true,
                effective_end,
                transition: Some(TransitionFrames {
                    earlier: frame,
                    later: prev,
                }),
            });
        }
        static_start = frame.timestamp;
        prev = frame;
    }

    info!("[DETECT] Entire video appears static from the beginning");
    Ok(BoundaryResult {
        effective_end,
        ..BoundaryResult::fallback(0.0)
    })
}
