// SYNOID Frame Source - Sampled Grayscale Decoding
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The boundary detector never touches ffmpeg directly. It asks a
// `FrameSource` for a run of evenly spaced grayscale samples, one decode
// window at a time, so an hour-long video never sits in memory at once.

use crate::agent::source_tools::{probe_video, safe_arg_path, VideoProbe};
use crate::agent::vision_tools::analysis_dimensions;
use crate::config::SpliceConfig;
use crate::error::{Result, SpliceError};
use async_trait::async_trait;
use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A decoded, grayscale-reduced sample.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: f64,
    pub image: GrayImage,
}

#[async_trait]
pub trait FrameSource: Send {
    /// Length of the media in seconds.
    fn duration(&self) -> f64;

    /// Decode `count` samples at `start + k * step`.
    ///
    /// May return fewer frames when the window runs past the end of the
    /// stream. Timestamps are strictly increasing.
    async fn sample(&mut self, start: f64, step: f64, count: usize) -> Result<Vec<Frame>>;

    /// Full-resolution colour frame at `timestamp`, for review snapshots.
    /// `None` when the source has no colour pictures to offer.
    async fn snapshot(&mut self, _timestamp: f64) -> Result<Option<RgbImage>> {
        Ok(None)
    }
}

/// Decodes samples by piping raw gray frames out of ffmpeg.
pub struct FfmpegFrameSource {
    path: PathBuf,
    ffmpeg: String,
    probe: VideoProbe,
    width: u32,
    height: u32,
}

impl FfmpegFrameSource {
    pub async fn open(path: &Path, config: &SpliceConfig) -> Result<Self> {
        let probe = probe_video(&config.ffprobe_bin, path).await?;
        Ok(Self::from_probe(path, config, probe))
    }

    /// Build a source from an already probed video.
    pub fn from_probe(path: &Path, config: &SpliceConfig, probe: VideoProbe) -> Self {
        let (width, height) =
            analysis_dimensions(probe.width, probe.height, config.detector.analysis_width);
        Self {
            path: path.to_path_buf(),
            ffmpeg: config.ffmpeg_bin.clone(),
            probe,
            width,
            height,
        }
    }

    pub fn probe(&self) -> &VideoProbe {
        &self.probe
    }

    fn decode_args(&self, start: f64, step: f64, count: usize) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-ss".to_string(),
            format!("{:.6}", start),
            "-i".to_string(),
            safe_arg_path(&self.path).to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!(
                "fps={:.6},scale={}:{},format=gray",
                1.0 / step,
                self.width,
                self.height
            ),
            "-frames:v".to_string(),
            count.to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "gray".to_string(),
            "-".to_string(),
        ]
    }

    fn snapshot_args(&self, timestamp: f64) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-ss".to_string(),
            format!("{:.6}", timestamp),
            "-i".to_string(),
            safe_arg_path(&self.path).to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn duration(&self) -> f64 {
        self.probe.duration
    }

    async fn sample(&mut self, start: f64, step: f64, count: usize) -> Result<Vec<Frame>> {
        if count == 0 || self.width == 0 || self.height == 0 {
            return Ok(Vec::new());
        }

        let output = Command::new(&self.ffmpeg)
            .kill_on_drop(true)
            .args(self.decode_args(start, step, count))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SpliceError::unreadable(&self.path, format!("failed to run {}: {}", self.ffmpeg, e))
            })?;

        if !output.status.success() {
            return Err(SpliceError::unreadable(
                &self.path,
                format!(
                    "frame decode at {:.2}s failed: {}",
                    start,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let frame_len = (self.width * self.height) as usize;
        let frames: Vec<Frame> = output
            .stdout
            .chunks_exact(frame_len)
            .take(count)
            .enumerate()
            .filter_map(|(i, chunk)| {
                GrayImage::from_raw(self.width, self.height, chunk.to_vec()).map(|image| Frame {
                    timestamp: start + i as f64 * step,
                    image,
                })
            })
            .collect();

        debug!(
            "[EYES] Decoded {}/{} samples from {:.2}s in {:?}",
            frames.len(),
            count,
            start,
            self.path
        );
        Ok(frames)
    }

    async fn snapshot(&mut self, timestamp: f64) -> Result<Option<RgbImage>> {
        let (width, height) = (self.probe.width, self.probe.height);
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let output = Command::new(&self.ffmpeg)
            .kill_on_drop(true)
            .args(self.snapshot_args(timestamp))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SpliceError::unreadable(&self.path, format!("failed to run {}: {}", self.ffmpeg, e))
            })?;

        if !output.status.success() {
            return Err(SpliceError::unreadable(
                &self.path,
                format!(
                    "snapshot decode at {:.2}s failed: {}",
                    timestamp,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let frame_len = (width * height * 3) as usize;
        if output.stdout.len() < frame_len {
            return Ok(None);
        }
        let mut raw = output.stdout;
        raw.truncate(frame_len);
        Ok(RgbImage::from_raw(width, height, raw))
    }
}

type FrameGenerator = dyn Fn(f64) -> GrayImage + Send + Sync;
type SnapshotGenerator = dyn Fn(f64) -> RgbImage + Send + Sync;

/// In-memory source whose frames are computed from the timestamp.
/// Test fixture; production scans always decode through ffmpeg.
pub struct SyntheticFrameSource {
    duration: f64,
    generator: Box<FrameGenerator>,
    snapshots: Option<Box<SnapshotGenerator>>,
    decode_calls: usize,
}

impl SyntheticFrameSource {
    pub fn new(duration: f64, generator: impl Fn(f64) -> GrayImage + Send + Sync + 'static) -> Self {
        Self {
            duration,
            generator: Box::new(generator),
            snapshots: None,
            decode_calls: 0,
        }
    }

    /// Serve colour snapshots from `generator` instead of none.
    pub fn with_snapshots(mut self, generator: impl Fn(f64) -> RgbImage + Send + Sync + 'static) -> Self {
        self.snapshots = Some(Box::new(generator));
        self
    }

    /// Number of `sample` calls served so far.
    pub fn decode_calls(&self) -> usize {
        self.decode_calls
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    async fn sample(&mut self, start: f64, step: f64, count: usize) -> Result<Vec<Frame>> {
        self.decode_calls += 1;
        let frames = (0..count)
            .map(|i| start + i as f64 * step)
            .take_while(|t| *t < self.duration - 1e-9)
            .map(|timestamp| Frame {
                timestamp,
                image: (self.generator)(timestamp),
            })
            .collect();
        Ok(frames)
    }

    async fn snapshot(&mut self, timestamp: f64) -> Result<Option<RgbImage>> {
        Ok(self.snapshots.as_ref().map(|generate| generate(timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[tokio::test]
    async fn test_synthetic_source_stops_at_duration() {
        let mut source = SyntheticFrameSource::new(1.0, |t| {
            GrayImage::from_pixel(4, 4, Luma([(t * 100.0) as u8]))
        });
        let frames = source.sample(0.5, 0.1, 20).await.unwrap();
        assert_eq!(frames.len(), 5);
        assert!((frames[0].timestamp - 0.5).abs() < 1e-9);
        assert!((frames[4].timestamp - 0.9).abs() < 1e-9);
        assert_eq!(frames[4].image.get_pixel(0, 0)[0], 90);
        assert_eq!(source.decode_calls(), 1);
    }

    #[test]
    fn test_decode_args_shape() {
        let config = SpliceConfig::default();
        let probe = VideoProbe {
            duration: 12.0,
            width: 1280,
            height: 720,
            fps: 30.0,
            has_audio: true,
        };
        let source = FfmpegFrameSource::from_probe(Path::new("-clip.mp4"), &config, probe);
        let args = source.decode_args(3.0, 0.1, 50);

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "fps=10.000000,scale=320:180,format=gray");
        let frames = args.iter().position(|a| a == "-frames:v").unwrap();
        assert_eq!(args[frames + 1], "50");
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input + 1], "./-clip.mp4");
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn test_snapshot_args_keep_full_resolution() {
        let config = SpliceConfig::default();
        let probe = VideoProbe {
            duration: 12.0,
            width: 1280,
            height: 720,
            fps: 30.0,
            has_audio: false,
        };
        let source = FfmpegFrameSource::from_probe(Path::new("clip.mp4"), &config, probe);
        let args = source.snapshot_args(2.5);

        assert!(!args.iter().any(|a| a == "-vf"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "2.500000");
        let fmt = args.iter().position(|a| a == "-pix_fmt").unwrap();
        assert_eq!(args[fmt + 1], "rgb24");
    }

    #[tokio::test]
    async fn test_synthetic_snapshots_are_opt_in() {
        let mut plain = SyntheticFrameSource::new(1.0, |_| GrayImage::new(2, 2));
        assert!(plain.snapshot(0.5).await.unwrap().is_none());

        let mut colour = SyntheticFrameSource::new(1.0, |_| GrayImage::new(2, 2))
            .with_snapshots(|_| RgbImage::from_pixel(6, 4, image::Rgb([10, 200, 10])));
        let frame = colour.snapshot(0.5).await.unwrap().unwrap();
        assert_eq!(frame.dimensions(), (6, 4));
    }
}
