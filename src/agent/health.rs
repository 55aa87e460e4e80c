// SYNOID Health Check
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Verifies that the external media tools are callable before a batch
// starts, so a missing ffmpeg is reported once instead of once per file.

use crate::config::SpliceConfig;
use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output when available.
    pub version: Option<String>,
}

async fn check_tool(bin: &str) -> ToolStatus {
    let result = tokio::time::timeout(
        tokio::time::Duration::from_secs(5),
        Command::new(bin).kill_on_drop(true).arg("-version").output(),
    )
    .await;

    let version = match result {
        Ok(Ok(out)) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string()),
        _ => None,
    };

    ToolStatus {
        name: bin.to_string(),
        available: version.is_some(),
        version,
    }
}

/// Status of ffmpeg and ffprobe as configured.
pub async fn check_dependencies(config: &SpliceConfig) -> Vec<ToolStatus> {
    let mut report = Vec::with_capacity(2);
    for bin in [&config.ffmpeg_bin, &config.ffprobe_bin] {
        let status = check_tool(bin).await;
        match &status.version {
            Some(v) => info!("[HEALTH] {} OK: {}", bin, v),
            None => warn!("[HEALTH] {} is not callable", bin),
        }
        report.push(status);
    }
    report
}

/// Names of configured tools that could not be run.
pub fn missing(report: &[ToolStatus]) -> Vec<String> {
    report
        .iter()
        .filter(|t| !t.available)
        .map(|t| t.name.clone())
        .collect()
}
