// SYNOID Video Stitcher - Slide Splice Rendering
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Renders a `SplicePlan` in a single ffmpeg pass: every still is looped as
// its own input, the source clip is trimmed out of input 0, and the pieces
// are joined with the concat filter. The original audio track is mapped
// through untouched, so it keeps playing under the intro and outro stills.

use crate::agent::io_shield::AtomicMover;
use crate::agent::source_tools::{safe_arg_path, VideoProbe};
use crate::agent::splice_plan::{SegmentSource, SplicePlan};
use crate::config::EncoderConfig;
use crate::error::{Result, SpliceError};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

pub struct VideoStitcher<'a> {
    ffmpeg: &'a str,
    encoder: &'a EncoderConfig,
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}

/// Container for the sidecar file, which has no usable extension itself.
fn container_for(output: &Path) -> &'static str {
    match output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mov") => "mov",
        Some("avi") => "avi",
        _ => "mp4",
    }
}

impl<'a> VideoStitcher<'a> {
    pub fn new(ffmpeg: &'a str, encoder: &'a EncoderConfig) -> Self {
        Self { ffmpeg, encoder }
    }

    /// Build the `-filter_complex` graph for a plan.
    ///
    /// Still `n` (in segment order) is ffmpeg input `n + 1`; input 0 is the
    /// source video. The graph's output pad is `[vout]`.
    pub fn build_filter_graph(plan: &SplicePlan, probe: &VideoProbe) -> String {
        let (w, h) = (even(probe.width), even(probe.height));
        let normalize = format!(
            "scale={}:{},setsar=1,fps={:.6},format=yuv420p",
            w, h, probe.fps
        );

        let mut chains = Vec::with_capacity(plan.segments.len() + 1);
        let mut labels = String::new();
        let mut still_input = 1;

        for (i, segment) in plan.segments.iter().enumerate() {
            let chain = match &segment.source {
                SegmentSource::Still { .. } => {
                    let chain = format!(
                        "[{}:v]{},trim=duration={:.3},setpts=PTS-STARTPTS[v{}]",
                        still_input, normalize, segment.duration, i
                    );
                    still_input += 1;
                    chain
                }
                SegmentSource::Clip { start, end } => format!(
                    "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS,{}[v{}]",
                    start, end, normalize, i
                ),
            };
            chains.push(chain);
            labels.push_str(&format!("[v{}]", i));
        }

        chains.push(format!(
            "{}concat=n={}:v=1:a=0[vout]",
            labels,
            plan.segments.len()
        ));
        chains.join(";")
    }

    /// Full ffmpeg argument list rendering `plan` into `target`.
    pub fn build_args(
        &self,
        source: &Path,
        plan: &SplicePlan,
        probe: &VideoProbe,
        target: &Path,
        container: &str,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-nostdin".into(),
            "-i".into(),
            safe_arg_path(source).to_string_lossy().to_string(),
        ];

        for (image, duration) in plan.stills() {
            args.extend([
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                format!("{:.6}", probe.fps),
                "-t".into(),
                format!("{:.3}", duration),
                "-i".into(),
                safe_arg_path(image).to_string_lossy().to_string(),
            ]);
        }

        args.extend([
            "-filter_complex".into(),
            Self::build_filter_graph(plan, probe),
            "-map".into(),
            "[vout]".into(),
            "-map".into(),
            "0:a?".into(),
            "-c:v".into(),
            self.encoder.video_codec.clone(),
            "-preset".into(),
            self.encoder.preset.clone(),
            "-pix_fmt".into(),
            self.encoder.pixel_format.clone(),
            "-r".into(),
            format!("{:.6}", probe.fps),
            "-threads".into(),
            self.encoder.threads.to_string(),
            "-c:a".into(),
            self.encoder.audio_codec.clone(),
            "-t".into(),
            format!("{:.3}", plan.total_duration()),
        ]);

        if container != "avi" {
            args.extend(["-movflags".into(), "+faststart".into()]);
        }

        args.extend([
            "-f".into(),
            container.to_string(),
            safe_arg_path(target).to_string_lossy().to_string(),
        ]);
        args
    }

    /// Render the plan. The result only appears at `output` if ffmpeg
    /// succeeded; a failed render leaves nothing behind.
    pub async fn render(
        &self,
        source: &Path,
        plan: &SplicePlan,
        probe: &VideoProbe,
        output: &Path,
    ) -> Result<PathBuf> {
        if plan.segments.is_empty() {
            return Err(SpliceError::encode(output, "splice plan has no segments"));
        }

        let tmp = AtomicMover::tmp_path_for(output);
        let args = self.build_args(source, plan, probe, &tmp, container_for(output));

        info!(
            "[SPLICE] Rendering {:?} ({:?}, {} segment(s), {:.2}s)",
            output,
            plan.layout,
            plan.segments.len(),
            plan.total_duration()
        );

        let result = Command::new(self.ffmpeg)
            .kill_on_drop(true)
            .args(&args)
            .output()
            .await;

        let output_status = match result {
            Ok(out) => out,
            Err(e) => {
                AtomicMover::discard(&tmp);
                return Err(SpliceError::encode(
                    output,
                    format!("failed to run {}: {}", self.ffmpeg, e),
                ));
            }
        };

        if !output_status.status.success() {
            AtomicMover::discard(&tmp);
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            error!("[SPLICE] ❌ ffmpeg failed for {:?}", output);
            return Err(SpliceError::encode(
                output,
                format!(
                    "ffmpeg exited with {}: {}",
                    output_status.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            ));
        }

        AtomicMover::commit(&tmp, output).map_err(|e| {
            AtomicMover::discard(&tmp);
            SpliceError::encode(output, format!("could not move render into place: {}", e))
        })?;

        info!("[SPLICE] ✅ Final output: {:?}", output);
        Ok(output.to_path_buf())
    }
}
