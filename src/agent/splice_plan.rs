// SYNOID Splice Plan
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Pure timeline arithmetic: turns the detected boundaries and bound assets
// into the ordered segments the stitcher renders. No I/O happens here.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MIN_SEGMENT_SECS: f64 = 1e-3;

/// Where a segment's pictures come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentSource {
    /// A still image held for the segment's duration.
    Still { image: PathBuf },
    /// A slice `[start, end)` of the source video.
    Clip { start: f64, end: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub source: SegmentSource,
    pub duration: f64,
    /// Range of the original audio that plays under this segment.
    pub audio: (f64, f64),
}

/// Which of the three assembly shapes applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpliceLayout {
    /// intro still + middle clip + outro still
    Full,
    /// intro still + rest of the video; outro dropped
    IntroAndRemainder,
    /// the video is no longer than the intro
    IntroOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplicePlan {
    pub layout: SpliceLayout,
    pub video_duration: f64,
    pub intro_duration: f64,
    pub outro_duration: f64,
    pub segments: Vec<Segment>,
}

impl SplicePlan {
    /// Lay out `[slide for intro_duration] + [middle] + [mantra for outro]`.
    ///
    /// `outro_timestamp` is a point in time; the outro lasts from there to the
    /// end. When intro and outro overlap (`intro + outro >= duration`) the
    /// outro is dropped and the rest of the video follows the intro. With no
    /// mantra, or an empty outro, the same intro-plus-remainder shape is used.
    pub fn build(
        video_duration: f64,
        intro_duration: f64,
        outro_timestamp: f64,
        slide: &Path,
        mantra: Option<&Path>,
    ) -> Self {
        let video_duration = video_duration.max(0.0);
        let intro_duration = intro_duration.max(0.0);
        let outro_timestamp = outro_timestamp.clamp(0.0, video_duration);
        let outro_duration = video_duration - outro_timestamp;

        let intro = Segment {
            source: SegmentSource::Still {
                image: slide.to_path_buf(),
            },
            duration: intro_duration,
            audio: (0.0, intro_duration.min(video_duration)),
        };

        let full = video_duration > intro_duration + outro_duration
            && outro_duration >= MIN_SEGMENT_SECS;

        let (layout, segments) = match mantra {
            Some(mantra) if full => {
                let middle_end = video_duration - outro_duration;
                let middle = Segment {
                    source: SegmentSource::Clip {
                        start: intro_duration,
                        end: middle_end,
                    },
                    duration: middle_end - intro_duration,
                    audio: (intro_duration, middle_end),
                };
                let outro = Segment {
                    source: SegmentSource::Still {
                        image: mantra.to_path_buf(),
                    },
                    duration: outro_duration,
                    audio: (middle_end, video_duration),
                };
                (SpliceLayout::Full, vec![intro, middle, outro])
            }
            _ if video_duration > intro_duration => {
                if mantra.is_some() && outro_duration >= MIN_SEGMENT_SECS {
                    warn!(
                        "[SPLICE] Intro {:.2}s and outro {:.2}s overlap in a {:.2}s video; dropping outro",
                        intro_duration, outro_duration, video_duration
                    );
                }
                let rest = Segment {
                    source: SegmentSource::Clip {
                        start: intro_duration,
                        end: video_duration,
                    },
                    duration: video_duration - intro_duration,
                    audio: (intro_duration, video_duration),
                };
                (SpliceLayout::IntroAndRemainder, vec![intro, rest])
            }
            _ => {
                info!(
                    "[SPLICE] Video ({:.2}s) is not longer than the intro ({:.2}s); using slide only",
                    video_duration, intro_duration
                );
                (SpliceLayout::IntroOnly, vec![intro])
            }
        };

        let outro_duration = match layout {
            SpliceLayout::Full => outro_duration,
            _ => 0.0,
        };

        Self {
            layout,
            video_duration,
            intro_duration,
            outro_duration,
            segments: segments
                .into_iter()
                .filter(|s| s.duration >= MIN_SEGMENT_SECS)
                .collect(),
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Still images in segment order.
    pub fn stills(&self) -> impl Iterator<Item = (&Path, f64)> {
        self.segments.iter().filter_map(|s| match &s.source {
            SegmentSource::Still { image } => Some((image.as_path(), s.duration)),
            SegmentSource::Clip { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide() -> &'static Path {
        Path::new("slides/walk.png")
    }

    fn mantra() -> &'static Path {
        Path::new("mantras/breathe.jpg")
    }

    #[test]
    fn test_full_layout_preserves_duration() {
        let plan = SplicePlan::build(20.0, 3.0, 17.0, slide(), Some(mantra()));
        assert_eq!(plan.layout, SpliceLayout::Full);
        assert_eq!(plan.segments.len(), 3);
        assert!((plan.total_duration() - 20.0).abs() < 1e-9);

        assert_eq!(plan.segments[0].audio, (0.0, 3.0));
        assert_eq!(
            plan.segments[1].source,
            SegmentSource::Clip { start: 3.0, end: 17.0 }
        );
        assert_eq!(plan.segments[2].audio, (17.0, 20.0));
        assert_eq!(plan.outro_duration, 3.0);
    }

    #[test]
    fn test_overlap_drops_outro() {
        let plan = SplicePlan::build(6.0, 4.0, 3.0, slide(), Some(mantra()));
        assert_eq!(plan.layout, SpliceLayout::IntroAndRemainder);
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.outro_duration, 0.0);
        assert!((plan.total_duration() - 6.0).abs() < 1e-9);
        assert_eq!(plan.stills().count(), 1);
    }

    #[test]
    fn test_short_video_is_intro_only() {
        let plan = SplicePlan::build(4.0, 5.0, 0.0, slide(), Some(mantra()));
        assert_eq!(plan.layout, SpliceLayout::IntroOnly);
        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].duration, 5.0);
        assert_eq!(plan.segments[0].audio, (0.0, 4.0));
    }

    #[test]
    fn test_missing_mantra_keeps_remainder() {
        let plan = SplicePlan::build(30.0, 5.0, 30.0, slide(), None);
        assert_eq!(plan.layout, SpliceLayout::IntroAndRemainder);
        assert!((plan.total_duration() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_outro_is_not_full() {
        let plan = SplicePlan::build(10.0, 2.0, 10.0, slide(), Some(mantra()));
        assert_eq!(plan.layout, SpliceLayout::IntroAndRemainder);
    }

    #[test]
    fn test_outro_timestamp_is_clamped() {
        let plan = SplicePlan::build(10.0, 2.0, -1.0, slide(), Some(mantra()));
        // Outro would cover the whole video, so it overlaps the intro.
        assert_eq!(plan.layout, SpliceLayout::IntroAndRemainder);
    }
}
