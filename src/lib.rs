// SYNOID Splice Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod agent;
pub mod config;
pub mod error;

pub use config::SpliceConfig;
pub use error::{Result, SpliceError};
