// SYNOID I/O Shield - Shadow Write & Atomic Move
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Renders never write to their final path directly:
//   1. ffmpeg writes to a `.synoid_tmp` sidecar.
//   2. On success, `AtomicMover::commit()` renames it into place.
//   3. On failure, `AtomicMover::discard()` deletes the sidecar so no
//      truncated video is left behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct AtomicMover;

impl AtomicMover {
    /// Move a completed temp file to its final destination.
    ///
    /// * Same drive → `fs::rename` (atomic, zero-copy).
    /// * Cross-drive → `fs::copy` + `fs::remove_file` (fallback).
    pub fn commit(temp_path: &Path, final_path: &Path) -> io::Result<()> {
        if !temp_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source temp file missing: {:?}", temp_path),
            ));
        }

        match fs::rename(temp_path, final_path) {
            Ok(()) => {
                info!("[IO_SHIELD] ✅ Atomic rename: {:?} → {:?}", temp_path, final_path);
                Ok(())
            }
            Err(rename_err) => {
                warn!(
                    "[IO_SHIELD] Rename failed ({}). Falling back to copy-delete.",
                    rename_err
                );
                if let Err(e) = fs::copy(temp_path, final_path) {
                    let _ = fs::remove_file(final_path);
                    return Err(e);
                }
                fs::remove_file(temp_path)?;
                info!("[IO_SHIELD] ✅ Cross-drive move complete: {:?} → {:?}", temp_path, final_path);
                Ok(())
            }
        }
    }

    /// Remove a failed render's sidecar, if any.
    pub fn discard(temp_path: &Path) {
        if temp_path.exists() {
            match fs::remove_file(temp_path) {
                Ok(()) => info!("[IO_SHIELD] Discarded partial output {:?}", temp_path),
                Err(e) => warn!("[IO_SHIELD] ❌ Could not remove {:?}: {}", temp_path, e),
            }
        }
    }

    /// Sidecar path for a final output path.
    ///
    /// Example: `output.mp4` → `output.mp4.synoid_tmp`
    pub fn tmp_path_for(final_path: &Path) -> PathBuf {
        let mut tmp = final_path.as_os_str().to_owned();
        tmp.push(".synoid_tmp");
        PathBuf::from(tmp)
    }
}
