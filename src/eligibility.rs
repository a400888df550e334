//! Age-category eligibility and suspension checks.
//!
//! Age is evaluated within the tournament's calendar year, and a player must
//! enter the highest age category they qualify for: eligibility for a higher
//! age group forbids entering a lower one.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AgeCategoryId, PlayerId, PlayerSuspension};

/// One age category with its inclusive age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeCategoryRule {
    pub age_category_id: AgeCategoryId,
    pub min_age: u32,
    pub max_age: u32,
}

/// Age within the tournament's calendar year.
///
/// A player born in 1966 is 60 for a 2026 tournament regardless of birthday.
pub fn age_in_competition_year(birth_year: i32, tournament_year: i32) -> i32 {
    tournament_year - birth_year
}

/// All categories the player may enter for the tournament year.
pub fn eligible_categories(
    birth_year: i32,
    tournament_year: i32,
    categories: &[AgeCategoryRule],
) -> Vec<AgeCategoryRule> {
    let age = age_in_competition_year(birth_year, tournament_year);
    categories
        .iter()
        .copied()
        .filter(|c| age >= c.min_age as i32 && age <= c.max_age as i32)
        .collect()
}

/// The single mandatory category: the highest eligible one by `min_age`.
pub fn required_category(
    birth_year: i32,
    tournament_year: i32,
    categories: &[AgeCategoryRule],
) -> EngineResult<AgeCategoryId> {
    eligible_categories(birth_year, tournament_year, categories)
        .into_iter()
        .max_by_key(|c| c.min_age)
        .map(|c| c.age_category_id)
        .ok_or_else(|| {
            EngineError::Eligibility(format!(
                "no eligible age category for birth_year={birth_year} in {tournament_year}"
            ))
        })
}

/// Whether the requested category is the player's mandatory one.
pub fn entry_category_allowed(
    birth_year: i32,
    tournament_year: i32,
    requested: AgeCategoryId,
    categories: &[AgeCategoryRule],
) -> EngineResult<bool> {
    Ok(required_category(birth_year, tournament_year, categories)? == requested)
}

/// Whether the player is barred at the given instant.
///
/// Suspension bounds are day-granular and inclusive on both ends: the start
/// day counts from midnight, the end day until 23:59:59 UTC.
pub fn is_suspended(
    player_id: PlayerId,
    at: DateTime<Utc>,
    suspensions: &[PlayerSuspension],
) -> bool {
    suspensions.iter().any(|s| {
        if s.player_id != player_id {
            return false;
        }
        let start = Utc.from_utc_datetime(&s.suspension_start.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(
            &s.suspension_end
                .and_time(NaiveTime::from_hms_opt(23, 59, 59).expect("valid time")),
        );
        start <= at && at <= end
    })
}
