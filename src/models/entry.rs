//! Tournament entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgeCategoryId, GenderId, PlayerId, TournamentId};

/// A player's entry into one tournament draw context.
///
/// Entries are immutable once the entry deadline passes and are uniquely keyed
/// by (tournament, player, age category, gender).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub age_category_id: AgeCategoryId,
    pub gender_id: GenderId,

    /// Ranking points the player carried at entry time; drives the
    /// deterministic fallback ordering in the draw builder.
    pub entry_points: i64,

    pub entry_timestamp: DateTime<Utc>,
}

impl Entry {
    /// Natural key for duplicate detection.
    pub fn natural_key(&self) -> (TournamentId, PlayerId, AgeCategoryId, GenderId) {
        (
            self.tournament_id,
            self.player_id,
            self.age_category_id,
            self.gender_id,
        )
    }
}
