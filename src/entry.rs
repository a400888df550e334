//! Entry admission checks.
//!
//! Pure validation of one entry request against the tournament calendar,
//! age-category rules, suspensions and the existing entry list. Nothing is
//! persisted here; an accepted request is returned as the [`Entry`] row the
//! caller should store.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::{entry_deadline, IsoWeek};
use crate::eligibility::{is_suspended, required_category, AgeCategoryRule};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AgeCategoryId, Entry, GenderId, PlayerId, PlayerSuspension, Tournament, TournamentId,
};
use crate::rules::TimingRules;

/// One entry request as submitted by a player.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub birth_year: i32,
    pub age_category_id: AgeCategoryId,
    pub gender_id: GenderId,
    pub entry_points: i64,
    pub entry_timestamp: DateTime<Utc>,
}

/// Validate an entry request and produce the row to persist.
///
/// Checks, in order: the tournament exists; the timestamp beats the entry
/// deadline; the player is not suspended at entry time; the requested age
/// category is the player's mandatory one; no duplicate entry exists for the
/// same (tournament, player, category, gender).
pub fn create_entry(
    request: &EntryRequest,
    tournaments: &[Tournament],
    age_categories: &[AgeCategoryRule],
    suspensions: &[PlayerSuspension],
    existing_entries: &[Entry],
    timing: &TimingRules,
) -> EngineResult<Entry> {
    let tournament = tournaments
        .iter()
        .find(|t| t.tournament_id == request.tournament_id)
        .ok_or_else(|| {
            EngineError::NotFound(format!("tournament not found: {}", request.tournament_id))
        })?;

    let deadline = entry_deadline(timing, IsoWeek::new(tournament.year, tournament.week))?;
    if request.entry_timestamp > deadline {
        return Err(EngineError::Deadline(format!(
            "entry blocked: timestamp {} is after deadline {deadline}",
            request.entry_timestamp
        )));
    }

    if is_suspended(request.player_id, request.entry_timestamp, suspensions) {
        return Err(EngineError::Eligibility(format!(
            "player {} is suspended at entry time",
            request.player_id
        )));
    }

    // No playing down: only the highest eligible category is allowed.
    let required = required_category(request.birth_year, tournament.year, age_categories)?;
    if request.age_category_id != required {
        return Err(EngineError::Eligibility(format!(
            "player {} must enter age_category_id={required} for {} (requested {})",
            request.player_id, tournament.year, request.age_category_id
        )));
    }

    let entry = Entry {
        tournament_id: request.tournament_id,
        player_id: request.player_id,
        age_category_id: request.age_category_id,
        gender_id: request.gender_id,
        entry_points: request.entry_points,
        entry_timestamp: request.entry_timestamp,
    };
    if existing_entries
        .iter()
        .any(|e| e.natural_key() == entry.natural_key())
    {
        return Err(EngineError::validation(format!(
            "duplicate entry for player {} in tournament {}",
            request.player_id, request.tournament_id
        )));
    }

    debug!(
        player_id = request.player_id,
        tournament_id = request.tournament_id,
        age_category_id = request.age_category_id,
        "entry accepted"
    );
    Ok(entry)
}
