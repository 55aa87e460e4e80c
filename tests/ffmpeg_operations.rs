use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};
use synoid_splice::agent::asset_matcher::FsCatalog;
use synoid_splice::agent::batch::{
    BatchOptions, BatchPaths, FileOutcome, IntroMode, SpliceBatch, Stage,
};
use synoid_splice::agent::io_shield::AtomicMover;
use synoid_splice::agent::source_tools::{probe_video, VideoProbe};
use synoid_splice::agent::splice_plan::SplicePlan;
use synoid_splice::agent::video_stitcher::VideoStitcher;
use synoid_splice::config::{EncoderConfig, SpliceConfig};
use synoid_splice::SpliceError;

const SLIDE_COLOR: [u8; 3] = [250, 250, 250];
const MANTRA_COLOR: [u8; 3] = [10, 200, 10];

fn tool_available(bin: &str) -> bool {
    Command::new(bin)
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn libx264_available() -> bool {
    Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains("libx264"))
        .unwrap_or(false)
}

fn media_tools_ready() -> bool {
    if tool_available("ffmpeg") && tool_available("ffprobe") && libx264_available() {
        true
    } else {
        eprintln!("ffmpeg/ffprobe with libx264 not available; skipping");
        false
    }
}

/// 20s clip: 3s blue still, 14s moving pattern, 3s red still, with a tone.
fn make_source_video(path: &Path) {
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "color=c=blue:s=320x240:d=3:r=25",
            "-f",
            "lavfi",
            "-i",
            "testsrc=s=320x240:d=14:r=25",
            "-f",
            "lavfi",
            "-i",
            "color=c=red:s=320x240:d=3:r=25",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=20",
            "-filter_complex",
            "[0:v][1:v][2:v]concat=n=3:v=1:a=0[v]",
            "-map",
            "[v]",
            "-map",
            "3:a",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-t",
            "20",
        ])
        .arg(path)
        .output()
        .expect("Failed to execute ffmpeg");

    if !status.status.success() {
        eprintln!("FFmpeg stderr: {}", String::from_utf8_lossy(&status.stderr));
        panic!("Failed to create test video");
    }
}

fn make_still(path: &Path, color: [u8; 3]) {
    RgbImage::from_pixel(320, 240, Rgb(color)).save(path).unwrap();
}

/// Decode the frame shown at `at` seconds and average its colour.
fn mean_color_at(video: &Path, at: f64, scratch: &Path) -> [f64; 3] {
    let png = scratch.join(format!("frame_{:.1}.png", at));
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-ss", &format!("{:.3}", at), "-i"])
        .arg(video)
        .args(["-frames:v", "1"])
        .arg(&png)
        .output()
        .expect("Failed to execute ffmpeg");
    assert!(status.status.success(), "frame grab at {}s failed", at);

    let frame = image::open(&png).unwrap().to_rgb8();
    let mut sum = [0.0f64; 3];
    for pixel in frame.pixels() {
        for (acc, v) in sum.iter_mut().zip(pixel.0) {
            *acc += v as f64;
        }
    }
    let n = (frame.width() * frame.height()) as f64;
    sum.map(|c| c / n)
}

fn near(color: [f64; 3], expected: [u8; 3], tolerance: f64) -> bool {
    color
        .iter()
        .zip(expected)
        .all(|(c, e)| (c - e as f64).abs() <= tolerance)
}

#[tokio::test]
async fn test_batch_splice_preserves_duration() {
    if !media_tools_ready() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let paths = BatchPaths::under(dir.path());
    for d in [&paths.videos_dir, &paths.slides_dir, &paths.mantras_dir] {
        fs::create_dir_all(d).unwrap();
    }
    make_source_video(&paths.videos_dir.join("Morning Walk!.mp4"));
    make_still(&paths.slides_dir.join("morning-walk.png"), SLIDE_COLOR);
    make_still(&paths.mantras_dir.join("breathe.png"), MANTRA_COLOR);

    let config = SpliceConfig::default();
    let options = BatchOptions {
        seed: Some(7),
        ..BatchOptions::default()
    };
    let report = SpliceBatch::new(&config, &FsCatalog, paths.clone(), options)
        .run()
        .await
        .unwrap();

    assert_eq!(report.processed(), 1, "report: {:?}", report);
    match &report.files[0].outcome {
        FileOutcome::Processed {
            output,
            intro_duration,
            total_duration,
            ..
        } => {
            assert!(
                (intro_duration - 3.0).abs() <= 0.2,
                "intro detected at {}",
                intro_duration
            );
            assert!((total_duration - 20.0).abs() < 1e-6);

            let probe = probe_video("ffprobe", output).await.unwrap();
            assert!(
                (probe.duration - 20.0).abs() < 0.5,
                "Duration should be approx 20s, got {}",
                probe.duration
            );
            assert!(probe.has_audio);
            assert!(!AtomicMover::tmp_path_for(output).exists());

            let intro = mean_color_at(output, 1.5, dir.path());
            let middle = mean_color_at(output, 10.0, dir.path());
            let outro = mean_color_at(output, 18.5, dir.path());
            assert!(near(intro, SLIDE_COLOR, 20.0), "intro frame {:?}", intro);
            assert!(near(outro, MANTRA_COLOR, 20.0), "outro frame {:?}", outro);
            assert!(
                !near(middle, SLIDE_COLOR, 20.0) && !near(middle, MANTRA_COLOR, 20.0),
                "middle frame {:?} should come from the source",
                middle
            );
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert!(paths.snapshots_dir.join("Morning Walk!_1.png").exists());
    assert!(paths.snapshots_dir.join("Morning Walk!_2.png").exists());
}

#[tokio::test]
async fn test_failed_encode_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp4");
    let encoder = EncoderConfig {
        video_codec: "synoid-no-such-codec".to_string(),
        ..EncoderConfig::default()
    };
    let probe = VideoProbe {
        duration: 6.0,
        width: 320,
        height: 240,
        fps: 25.0,
        has_audio: false,
    };
    let plan = SplicePlan::build(
        6.0,
        1.0,
        5.0,
        &dir.path().join("slide.png"),
        Some(&dir.path().join("mantra.png")),
    );

    let result = VideoStitcher::new("ffmpeg", &encoder)
        .render(&dir.path().join("missing.mp4"), &plan, &probe, &output)
        .await;

    assert!(matches!(result, Err(SpliceError::EncodeFailure { .. })));
    assert!(!output.exists());
    assert!(!AtomicMover::tmp_path_for(&output).exists());
}

#[tokio::test]
async fn test_batch_continues_past_missing_slide() {
    let dir = tempfile::tempdir().unwrap();
    let paths = BatchPaths::under(dir.path());
    for d in [&paths.videos_dir, &paths.slides_dir, &paths.mantras_dir] {
        fs::create_dir_all(d).unwrap();
    }
    // Neither file is a real video; "a" gets past matching, "b" does not.
    fs::write(paths.videos_dir.join("a.mp4"), b"not a video").unwrap();
    fs::write(paths.videos_dir.join("b.MOV"), b"not a video").unwrap();
    fs::write(paths.slides_dir.join("a.png"), b"x").unwrap();
    fs::write(paths.mantras_dir.join("calm.jpg"), b"x").unwrap();

    let config = SpliceConfig::default();
    let report = SpliceBatch::new(&config, &FsCatalog, paths, BatchOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.processed(), 0);

    match &report.files[0].outcome {
        FileOutcome::Skipped { stage, error, .. } => {
            assert_eq!(*stage, Stage::Detect);
            assert_eq!(error, "MediaUnreadable");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    match &report.files[1].outcome {
        FileOutcome::Skipped { stage, error, .. } => {
            assert_eq!(*stage, Stage::Match);
            assert_eq!(error, "MissingAsset");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_stalled_file_times_out_and_batch_continues() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let stall = dir.path().join("stalled-ffprobe");
    fs::write(&stall, "#!/bin/sh\nsleep 30\n").unwrap();
    fs::set_permissions(&stall, fs::Permissions::from_mode(0o755)).unwrap();

    let paths = BatchPaths::under(dir.path());
    for d in [&paths.videos_dir, &paths.slides_dir, &paths.mantras_dir] {
        fs::create_dir_all(d).unwrap();
    }
    fs::write(paths.videos_dir.join("a.mp4"), b"not a video").unwrap();
    fs::write(paths.videos_dir.join("b.mp4"), b"not a video").unwrap();
    fs::write(paths.slides_dir.join("a.png"), b"x").unwrap();
    fs::write(paths.mantras_dir.join("calm.png"), b"x").unwrap();

    let config = SpliceConfig {
        ffprobe_bin: stall.to_string_lossy().to_string(),
        per_file_timeout_secs: 1,
        ..SpliceConfig::default()
    };
    let started = Instant::now();
    let report = SpliceBatch::new(&config, &FsCatalog, paths.clone(), BatchOptions::default())
        .run()
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(report.files.len(), 2);
    match &report.files[0].outcome {
        FileOutcome::Skipped { stage, error, reason } => {
            assert_eq!(*stage, Stage::Detect);
            assert_eq!(error, "MediaUnreadable");
            assert!(reason.contains("timed out"), "reason: {}", reason);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(
        &report.files[1].outcome,
        FileOutcome::Skipped { stage: Stage::Match, .. }
    ));

    let out = paths.output_dir.join("a.mp4");
    assert!(!out.exists());
    assert!(!AtomicMover::tmp_path_for(&out).exists());
}

#[tokio::test]
async fn test_fixed_intro_reads_media_info_only() {
    let dir = tempfile::tempdir().unwrap();
    let paths = BatchPaths::under(dir.path());
    for d in [&paths.videos_dir, &paths.slides_dir] {
        fs::create_dir_all(d).unwrap();
    }
    fs::write(paths.videos_dir.join("clip.mp4"), b"not a video").unwrap();
    fs::write(paths.slides_dir.join("clip.png"), b"x").unwrap();

    let config = SpliceConfig {
        ffprobe_bin: "synoid-no-such-ffprobe".to_string(),
        ..SpliceConfig::default()
    };
    let options = BatchOptions {
        intro_mode: IntroMode::Fixed(5.0),
        ..BatchOptions::default()
    };
    let report = SpliceBatch::new(&config, &FsCatalog, paths, options)
        .run()
        .await
        .unwrap();

    // No mantra folder exists; fixed mode must not ask for one.
    match &report.files[0].outcome {
        FileOutcome::Skipped { stage, error, reason } => {
            assert_eq!(*stage, Stage::Detect);
            assert_eq!(error, "MediaUnreadable");
            assert!(reason.contains("synoid-no-such-ffprobe"), "reason: {}", reason);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}
