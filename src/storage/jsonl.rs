//! JSONL (JSON Lines) storage.
//!
//! JSONL is the source of truth for all engine data.
//! Each line is a valid JSON object representing one record.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{StorageConfig, StorageError};
use crate::calendar::IsoWeek;
use crate::models::TournamentId;

/// Record types filed under a tournament's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Entry,
    DrawPlayer,
    SeedAssignment,
    Match,
    PointsHistory,
}

impl EntityType {
    /// Get the filename for this record type.
    pub fn filename(&self) -> &'static str {
        match self {
            EntityType::Entry => "entries.jsonl",
            EntityType::DrawPlayer => "draw_players.jsonl",
            EntityType::SeedAssignment => "seeds.jsonl",
            EntityType::Match => "matches.jsonl",
            EntityType::PointsHistory => "points_history.jsonl",
        }
    }
}

/// Path of a tournament's file for one record type.
pub fn entity_path(config: &StorageConfig, entity: EntityType, tournament_id: TournamentId) -> PathBuf {
    config
        .tournaments_dir()
        .join(tournament_id.to_string())
        .join(entity.filename())
}

/// Path of the ranking snapshot for one publication week.
pub fn ranking_path(config: &StorageConfig, week: IsoWeek) -> PathBuf {
    config
        .rankings_dir()
        .join(format!("{:04}-W{:02}.jsonl", week.year, week.week))
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for one record type under a tournament.
    pub fn for_entity(config: &StorageConfig, entity: EntityType, tournament_id: TournamentId) -> Self {
        Self::new(entity_path(config, entity, tournament_id))
    }

    /// One record per line; `truncate` replaces the file, otherwise appends.
    fn write_lines(&self, records: &[T], truncate: bool) -> Result<usize, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(!truncate)
            .write(truncate)
            .truncate(truncate)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(records.len())
    }

    /// Append a single record to the file.
    pub fn append(&self, record: &T) -> Result<(), StorageError> {
        self.write_lines(std::slice::from_ref(record), false)?;
        debug!(path = ?self.path, "record appended");
        Ok(())
    }

    /// Append multiple records to the file.
    pub fn append_batch(&self, records: &[T]) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = self.write_lines(records, false)?;
        info!(path = ?self.path, count, "records appended");
        Ok(count)
    }

    /// Write records, replacing the entire file.
    pub fn write_all(&self, records: &[T]) -> Result<usize, StorageError> {
        let count = self.write_lines(records, true)?;
        info!(path = ?self.path, count, "file rewritten");
        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for one record type under a tournament.
    pub fn for_entity(config: &StorageConfig, entity: EntityType, tournament_id: TournamentId) -> Self {
        Self::new(entity_path(config, entity, tournament_id))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all records from the file. A missing file reads as empty;
    /// unparseable lines are logged and skipped rather than failing the read.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = ?self.path, line = idx + 1, error = %e, "skipping unparseable line")
                }
            }
        }

        debug!(path = ?self.path, count = records.len(), "records read");
        Ok(records)
    }

    /// Read records matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }

    /// Count stored records without deserializing them.
    pub fn count(&self) -> Result<usize, StorageError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(text.lines().filter(|l| !l.trim().is_empty()).count())
    }

    /// Create a streaming iterator over the file.
    pub fn iter(&self) -> Result<JsonlIterator<T>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::PathNotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(JsonlIterator {
            lines: BufReader::new(file).lines(),
            _marker: PhantomData,
        })
    }
}

/// Streaming iterator over JSONL file entries; blank lines are skipped.
pub struct JsonlIterator<T> {
    lines: Lines<BufReader<File>>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for JsonlIterator<T> {
    type Item = Result<T, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            return match line {
                Ok(l) if l.trim().is_empty() => continue,
                Ok(l) => Some(serde_json::from_str(&l).map_err(StorageError::Json)),
                Err(e) => Some(Err(StorageError::Io(e))),
            };
        }
        None
    }
}

/// Find all stored tournament directories.
pub fn list_tournaments(config: &StorageConfig) -> Result<Vec<TournamentId>, StorageError> {
    let dir = config.tournaments_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
                ids.push(id);
            }
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Read the global tournament registry.
pub fn read_tournaments(
    config: &StorageConfig,
) -> Result<Vec<crate::models::Tournament>, StorageError> {
    let reader = JsonlReader::new(config.tournaments_path());
    reader.read_all()
}

/// Write the global tournament registry, sorted by start date.
pub fn write_tournaments(
    config: &StorageConfig,
    tournaments: &mut [crate::models::Tournament],
) -> Result<usize, StorageError> {
    tournaments.sort_by_key(|t| t.start_date);
    let writer = JsonlWriter::new(config.tournaments_path());
    writer.write_all(tournaments)
}

/// Read the global suspension register.
pub fn read_suspensions(
    config: &StorageConfig,
) -> Result<Vec<crate::models::PlayerSuspension>, StorageError> {
    let reader = JsonlReader::new(config.suspensions_path());
    reader.read_all()
}

/// Write the global suspension register, sorted by start date.
pub fn write_suspensions(
    config: &StorageConfig,
    suspensions: &mut [crate::models::PlayerSuspension],
) -> Result<usize, StorageError> {
    suspensions.sort_by_key(|s| (s.suspension_start, s.player_id));
    let writer = JsonlWriter::new(config.suspensions_path());
    writer.write_all(suspensions)
}
