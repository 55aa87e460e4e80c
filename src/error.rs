// SYNOID Splice Errors
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while processing a single video.
///
/// Every variant is scoped to one file; the batch driver records it and
/// moves on to the next input.
#[derive(Debug, Error)]
pub enum SpliceError {
    #[error("Media unreadable: {path:?}: {reason}")]
    MediaUnreadable { path: PathBuf, reason: String },

    #[error("Missing asset for {video:?}: {asset}")]
    MissingAsset { video: PathBuf, asset: String },

    #[error("Encode failed for {path:?}: {reason}")]
    EncodeFailure { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpliceError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MediaUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn encode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::EncodeFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Short label used in logs and batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MediaUnreadable { .. } => "MediaUnreadable",
            Self::MissingAsset { .. } => "MissingAsset",
            Self::EncodeFailure { .. } => "EncodeFailure",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Io(_) => "Io",
            Self::Image(_) => "Image",
            Self::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, SpliceError>;
