//! Filesystem persistence.
//!
//! Everything the engine produces lives as JSONL files under one data
//! directory:
//! - Global files (tournaments, suspensions)
//! - Per-tournament files (entries, draw players, seeds, matches, points)
//! - Per-week ranking snapshots

use std::path::PathBuf;

use thiserror::Error;

pub mod jsonl;

pub use jsonl::{EntityType, JsonlReader, JsonlWriter};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Directory holding one subdirectory per tournament.
    pub fn tournaments_dir(&self) -> PathBuf {
        self.data_dir.join("tournaments")
    }

    /// Directory holding one ranking snapshot file per publication week.
    pub fn rankings_dir(&self) -> PathBuf {
        self.data_dir.join("rankings")
    }

    /// Global tournament registry.
    pub fn tournaments_path(&self) -> PathBuf {
        self.data_dir.join("tournaments.jsonl")
    }

    /// Global suspension register. Suspensions outlive the tournament that
    /// produced them, so they are not filed per tournament.
    pub fn suspensions_path(&self) -> PathBuf {
        self.data_dir.join("suspensions.jsonl")
    }
}
