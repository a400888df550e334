//! Tournament metadata consumed from the persistence collaborator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TournamentId;

/// Tournament point category, highest-value events first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TournamentCategory {
    MT1000,
    MT700,
    MT400,
    MT200,
    MT100,
}

/// Tournament metadata.
///
/// `year`/`week` are the ISO year and week the tournament is played in; they
/// drive the entry deadline, draw publication and the ranking window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub tournament_id: TournamentId,
    pub name: String,
    pub category: TournamentCategory,
    pub year: i32,
    pub week: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
