// SYNOID Asset Matcher - Intro Slides & Outro Mantras
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Binds each video to the slide that shares its name and to a mantra
// drawn at random from a pool. Directory listing goes through
// `AssetCatalog` so lookups can run against in-memory fixtures.

use crate::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// Still-image extensions for slides and mantras (case-insensitive).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/// Lists candidate files in a directory.
pub trait AssetCatalog {
    /// Files directly inside `dir` whose extension matches one of
    /// `extensions`, sorted by path. A missing directory yields an empty list.
    fn list_candidates(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>>;
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Filesystem-backed catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCatalog;

impl AssetCatalog for FsCatalog {
    fn list_candidates(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, format!("walk {:?}: {}", dir, e))
            })?;
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Catalog over a fixed map of directory → file paths.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    dirs: HashMap<PathBuf, Vec<PathBuf>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file_name` inside `dir`.
    pub fn with_file(mut self, dir: impl AsRef<Path>, file_name: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(file_name);
        self.dirs.entry(dir).or_default().push(path);
        self
    }
}

impl AssetCatalog for InMemoryCatalog {
    fn list_candidates(&self, dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .dirs
            .get(dir)
            .map(|files| {
                files
                    .iter()
                    .filter(|p| has_extension(p, extensions))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        Ok(files)
    }
}

/// NFKD-normalize, keep alphanumerics only, case-fold.
pub fn normalize_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Find the slide for a video. An exact stem match wins; otherwise the
/// first slide whose normalized stem equals the normalized video stem.
pub fn find_matching_slide(
    catalog: &dyn AssetCatalog,
    video_stem: &str,
    slides_dir: &Path,
) -> Result<Option<PathBuf>> {
    let candidates = catalog.list_candidates(slides_dir, &IMAGE_EXTENSIONS)?;

    if let Some(exact) = candidates.iter().find(|p| stem_of(p) == video_stem) {
        debug!("[MATCH] Exact slide for '{}': {:?}", video_stem, exact);
        return Ok(Some(exact.clone()));
    }

    let wanted = normalize_name(video_stem);
    if wanted.is_empty() {
        return Ok(None);
    }

    let found = candidates
        .into_iter()
        .find(|p| normalize_name(&stem_of(p)) == wanted);

    match &found {
        Some(path) => info!("[MATCH] Slide for '{}': {:?}", video_stem, path),
        None => debug!("[MATCH] No slide matches '{}' ({})", video_stem, wanted),
    }
    Ok(found)
}

/// Draw one mantra image uniformly from `mantra_dir`.
pub fn pick_random_mantra<R: Rng + ?Sized>(
    catalog: &dyn AssetCatalog,
    mantra_dir: &Path,
    rng: &mut R,
) -> Result<Option<PathBuf>> {
    let pool = catalog.list_candidates(mantra_dir, &IMAGE_EXTENSIONS)?;
    let choice = pool.choose(rng).cloned();
    if let Some(path) = &choice {
        debug!("[MATCH] Mantra drawn from {} candidate(s): {:?}", pool.len(), path);
    }
    Ok(choice)
}
