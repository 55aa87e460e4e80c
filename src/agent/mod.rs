// SYNOID Agent Modules
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod asset_matcher;
pub mod batch;
pub mod boundary_detector;
pub mod frame_source;
pub mod health;
pub mod io_shield;
pub mod source_tools;
pub mod splice_plan;
pub mod video_stitcher;
pub mod vision_tools;
