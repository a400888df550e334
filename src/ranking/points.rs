//! Stage inference and points history.
//!
//! Stored round ids are stage-coded per draw, so stages are inferred from the
//! draw-relative ordering of the rounds actually present, never from the raw
//! round id. First-match losers and sanctioned players earn zero points but
//! still get a history record.

use tracing::debug;

use crate::models::{
    AgeCategoryId, DrawId, Match, MatchStatus, PlayerId, PointsHistoryRecord, StageResult,
    Tournament,
};
use crate::rules::RulesPolicy;

/// A player's inferred finishing position in one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: StageResult,
    /// True when the player recorded no win in the draw.
    pub first_match_loss: bool,
}

/// Infer the stage a player reached from the draw's recorded matches.
pub fn infer_stage(player_id: PlayerId, draw_id: DrawId, matches: &[Match]) -> StageOutcome {
    let draw_matches: Vec<&Match> = matches.iter().filter(|m| m.draw_id == draw_id).collect();

    let mut round_ids: Vec<u32> = draw_matches.iter().map(|m| m.round_id).collect();
    round_ids.sort_unstable();
    round_ids.dedup();
    if round_ids.is_empty() {
        return StageOutcome {
            stage: StageResult::LastSixtyFour,
            first_match_loss: true,
        };
    }

    let round_rank = |round_id: u32| -> u32 {
        round_ids
            .iter()
            .position(|&r| r == round_id)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    };
    let total_rounds = round_ids.len() as u32;
    let final_round_id = *round_ids.last().expect("non-empty rounds");

    let player_matches: Vec<&&Match> = draw_matches
        .iter()
        .filter(|m| m.involves(player_id))
        .collect();
    if player_matches.is_empty() {
        return StageOutcome {
            stage: StageResult::LastSixtyFour,
            first_match_loss: true,
        };
    }

    let wins = player_matches
        .iter()
        .filter(|m| m.winner_id == Some(player_id))
        .count();
    let first_match_loss = wins == 0;

    if let Some(final_match) = draw_matches.iter().find(|m| m.round_id == final_round_id) {
        if final_match.winner_id == Some(player_id) {
            return StageOutcome {
                stage: StageResult::Winner,
                first_match_loss,
            };
        }
        if final_match.involves(player_id) {
            return StageOutcome {
                stage: StageResult::Finalist,
                first_match_loss,
            };
        }
    }

    // Highest round the player lost in decides the stage.
    let last_loss_rank = player_matches
        .iter()
        .filter(|m| m.winner_id.is_some() && m.winner_id != Some(player_id))
        .map(|m| round_rank(m.round_id))
        .max();

    let rank = match last_loss_rank {
        Some(rank) => rank,
        // No recorded loss and not in the final: fall back to the highest
        // round reached.
        None => player_matches
            .iter()
            .map(|m| round_rank(m.round_id))
            .max()
            .unwrap_or(1),
    };

    StageOutcome {
        stage: StageResult::from_distance_to_final(total_rounds - rank),
        first_match_loss,
    }
}

/// Whether the player lost a walkover or disqualification match in the draw.
/// Either forfeits the whole tournament's points.
fn has_zero_points_status(player_id: PlayerId, draw_id: DrawId, matches: &[Match]) -> bool {
    matches.iter().any(|m| {
        m.draw_id == draw_id
            && matches!(m.status, MatchStatus::Walkover | MatchStatus::Disqualified)
            && m.involves(player_id)
            && m.winner_id != Some(player_id)
    })
}

/// Points history for every player of one draw.
pub fn calculate_points_history(
    draw_id: DrawId,
    tournament: &Tournament,
    age_category_id: AgeCategoryId,
    matches: &[Match],
    player_ids: &[PlayerId],
    policy: &RulesPolicy,
) -> Vec<PointsHistoryRecord> {
    player_ids
        .iter()
        .map(|&player_id| {
            let outcome = infer_stage(player_id, draw_id, matches);

            let points_earned = if has_zero_points_status(player_id, draw_id, matches) {
                0
            } else if outcome.first_match_loss {
                0
            } else {
                policy.points_for(tournament.category, outcome.stage)
            };

            debug!(
                player_id,
                draw_id,
                stage = ?outcome.stage,
                points_earned,
                "points recorded"
            );
            PointsHistoryRecord {
                player_id,
                tournament_id: tournament.tournament_id,
                age_category_id,
                stage_result: outcome.stage,
                points_earned,
                tournament_end_date: tournament.end_date,
            }
        })
        .collect()
}
