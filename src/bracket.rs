//! Bracket skeleton creation and the match advancement state machine.
//!
//! A bye is a missing bracket slot, not a placeholder player: first-round
//! slots are filled strictly from draw positions and an absent position
//! leaves the slot empty. Round ids are stage-coded so a quarter-final is
//! round 4 in every draw regardless of draw size.

use chrono::{Months, NaiveDate};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    DrawId, DrawPlayer, Match, MatchId, MatchStatus, PlayerId, PlayerSuspension, ScoreCard, Slot,
    SuspensionReason, TournamentId,
};
use crate::rules::DisciplineRules;
use crate::score::validate;

/// Bracket size for an entrant count: the next power-of-two draw, capped at 64.
pub fn draw_size_for_entries(num_entries: u32) -> u32 {
    match num_entries {
        0..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    }
}

/// Stage-coded first round: an 8-slot draw starts at the quarter-finals
/// (round 4), a 64-slot draw at round 1.
pub fn starting_round_id(draw_size: u32) -> u32 {
    match draw_size {
        8 => 4,
        16 => 3,
        32 => 2,
        _ => 1,
    }
}

fn matches_in_round(draw_size: u32, round_offset: u32) -> u32 {
    (draw_size / 2) >> round_offset
}

/// Next-round coordinates for a winner: match ceil(m/2), slot by parity.
pub fn advancement_target(match_number: u32) -> (u32, Slot) {
    let next_match_number = match_number.div_ceil(2);
    let slot = if match_number % 2 == 1 {
        Slot::Player1
    } else {
        Slot::Player2
    };
    (next_match_number, slot)
}

/// Create every scheduled match of a draw from its placed players.
///
/// First-round slots come from fixed pairs (position 2i-1 vs 2i); later
/// rounds start empty. Any first-round match with exactly one occupant has
/// that player advanced one round immediately — deeper byes resolve as
/// results come in, never at creation time.
pub fn create_match_skeleton(
    draw_id: DrawId,
    draw_players: &[DrawPlayer],
    tournament_start_date: NaiveDate,
    first_match_id: MatchId,
) -> EngineResult<Vec<Match>> {
    if draw_players.is_empty() {
        return Err(EngineError::NotFound(format!(
            "no draw players for draw_id={draw_id}"
        )));
    }

    // Size the bracket from the placement itself: the draw builder may have
    // spread the entrants across a larger grid than their headcount needs,
    // and the highest occupied position must still land in a first-round pair.
    let max_position = draw_players
        .iter()
        .map(|p| p.draw_position)
        .max()
        .unwrap_or(0);
    let draw_size =
        draw_size_for_entries(max_position.max(draw_players.len() as u32));
    let start_round_id = starting_round_id(draw_size);
    let position_of = |pos: u32| -> Option<PlayerId> {
        draw_players
            .iter()
            .find(|p| p.draw_position == pos)
            .map(|p| p.player_id)
    };

    let mut matches = Vec::new();
    let mut next_match_id = first_match_id;
    let mut round_offset = 0;
    loop {
        let count = matches_in_round(draw_size, round_offset);
        if count < 1 {
            break;
        }
        for i in 0..count {
            let (player1_id, player2_id) = if round_offset == 0 {
                (position_of(2 * i + 1), position_of(2 * i + 2))
            } else {
                (None, None)
            };
            matches.push(Match {
                match_id: next_match_id,
                draw_id,
                round_id: start_round_id + round_offset,
                match_number: i + 1,
                player1_id,
                player2_id,
                match_date: tournament_start_date,
                status: MatchStatus::Scheduled,
                winner_id: None,
                score: ScoreCard::blank(),
            });
            next_match_id += 1;
        }
        if count == 1 {
            break;
        }
        round_offset += 1;
    }

    // One level of bye auto-advance: a lone first-round occupant moves up.
    let byes: Vec<(u32, PlayerId)> = matches
        .iter()
        .filter(|m| m.round_id == start_round_id)
        .filter_map(|m| match (m.player1_id, m.player2_id) {
            (Some(p), None) | (None, Some(p)) => Some((m.match_number, p)),
            _ => None,
        })
        .collect();
    for (match_number, winner_id) in byes {
        let (next_match_number, slot) = advancement_target(match_number);
        if let Some(next) = matches.iter_mut().find(|m| {
            m.round_id == start_round_id + 1 && m.match_number == next_match_number
        }) {
            match slot {
                Slot::Player1 => next.player1_id = Some(winner_id),
                Slot::Player2 => next.player2_id = Some(winner_id),
            }
        }
    }

    info!(
        draw_id,
        draw_size,
        start_round_id,
        matches = matches.len(),
        "match skeleton created"
    );
    Ok(matches)
}

/// A result to apply to one match.
#[derive(Debug, Clone)]
pub struct ResultPayload {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub winner_id: PlayerId,
    pub score: ScoreCard,
}

/// Outcome of [`apply_result`]: the sanction to persist (if any new one was
/// produced) and where the winner advanced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedResult {
    pub new_suspension: Option<PlayerSuspension>,
    pub advanced_to: Option<(u32, u32, Slot)>,
}

fn add_months(date: NaiveDate, months: u32) -> EngineResult<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        EngineError::Configuration(format!("date overflow adding {months} months to {date}"))
    })
}

/// Apply a validated result and propagate the winner.
///
/// Nothing is mutated unless every check passes: unknown match ids are a
/// not-found error, an invalid scoreline or a sanction naming a non-participant
/// winner is a validation error. Walkovers and disqualifications sanction the
/// non-winning participant with a suspension anchored at the match date;
/// an already-recorded (player, tournament, reason) suspension is not
/// re-issued.
pub fn apply_result(
    matches: &mut [Match],
    draw_id: DrawId,
    tournament_id: TournamentId,
    payload: &ResultPayload,
    existing_suspensions: &[PlayerSuspension],
    discipline: &DisciplineRules,
) -> EngineResult<AppliedResult> {
    let index = matches
        .iter()
        .position(|m| m.match_id == payload.match_id && m.draw_id == draw_id)
        .ok_or_else(|| {
            EngineError::NotFound(format!(
                "match not found: match_id={}, draw_id={draw_id}",
                payload.match_id
            ))
        })?;

    validate::validate(&payload.score, payload.status).into_result()?;

    let sanction_reason = match payload.status {
        MatchStatus::Walkover => Some(SuspensionReason::Walkover),
        MatchStatus::Disqualified => Some(SuspensionReason::Disqualified),
        _ => None,
    };
    if sanction_reason.is_some() && !matches[index].involves(payload.winner_id) {
        return Err(EngineError::validation(format!(
            "sanction requires winner_id={} to be one of the match players",
            payload.winner_id
        )));
    }

    let (round_id, match_number, match_date) = {
        let m = &mut matches[index];
        m.status = payload.status;
        m.winner_id = Some(payload.winner_id);
        m.score = payload.score;
        (m.round_id, m.match_number, m.match_date)
    };

    let new_suspension = match sanction_reason {
        Some(reason) => {
            let m = &matches[index];
            let sanctioned = if m.player1_id == Some(payload.winner_id) {
                m.player2_id
            } else {
                m.player1_id
            }
            .ok_or_else(|| {
                EngineError::validation(format!(
                    "cannot resolve sanctioned player for match_id={}",
                    payload.match_id
                ))
            })?;

            let months = match reason {
                SuspensionReason::Walkover => discipline.walkover_suspension_months,
                SuspensionReason::Disqualified => discipline.disqualification_suspension_months,
            };
            let candidate = PlayerSuspension {
                player_id: sanctioned,
                tournament_id,
                reason,
                suspension_start: match_date,
                suspension_end: add_months(match_date, months)?,
            };
            let duplicate = existing_suspensions
                .iter()
                .any(|s| s.natural_key() == candidate.natural_key());
            if duplicate {
                debug!(
                    player_id = sanctioned,
                    tournament_id,
                    ?reason,
                    "suspension already recorded, skipping"
                );
                None
            } else {
                info!(
                    player_id = sanctioned,
                    tournament_id,
                    ?reason,
                    until = %candidate.suspension_end,
                    "player suspended"
                );
                Some(candidate)
            }
        }
        None => None,
    };

    // Write the winner into the next round, if one exists.
    let next_round_id = round_id + 1;
    let (next_match_number, slot) = advancement_target(match_number);
    let advanced_to = matches
        .iter_mut()
        .find(|m| {
            m.draw_id == draw_id
                && m.round_id == next_round_id
                && m.match_number == next_match_number
        })
        .map(|next| {
            match slot {
                Slot::Player1 => next.player1_id = Some(payload.winner_id),
                Slot::Player2 => next.player2_id = Some(payload.winner_id),
            }
            (next_round_id, next_match_number, slot)
        });

    Ok(AppliedResult {
        new_suspension,
        advanced_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SetScore;
    use chrono::NaiveDate;

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 13).unwrap()
    }

    fn draw_player(player_id: PlayerId, position: u32, has_bye: bool) -> DrawPlayer {
        DrawPlayer {
            draw_id: 1,
            player_id,
            draw_position: position,
            has_bye,
            entry_points: 0,
            entry_timestamp: chrono::Utc::now(),
        }
    }

    /// 6 entrants in an 8-slot bracket, seeds at 1 and 8 holding byes.
    fn six_player_draw() -> Vec<DrawPlayer> {
        vec![
            draw_player(1, 1, true),
            draw_player(3, 3, false),
            draw_player(4, 4, false),
            draw_player(5, 5, false),
            draw_player(6, 6, false),
            draw_player(2, 8, true),
        ]
    }

    fn completed_payload(match_id: MatchId, winner_id: PlayerId) -> ResultPayload {
        ResultPayload {
            match_id,
            status: MatchStatus::Completed,
            winner_id,
            score: ScoreCard {
                set1: SetScore::games(6, 3),
                set2: SetScore::games(6, 4),
                ..ScoreCard::blank()
            },
        }
    }

    #[test]
    fn test_skeleton_counts_and_rounds() {
        let matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        // QF=4, SF=2, F=1 for an 8-slot draw.
        assert_eq!(matches.len(), 7);
        assert_eq!(matches.iter().filter(|m| m.round_id == 4).count(), 4);
        assert_eq!(matches.iter().filter(|m| m.round_id == 5).count(), 2);
        assert_eq!(matches.iter().filter(|m| m.round_id == 6).count(), 1);
        assert!(matches.iter().all(|m| m.status == MatchStatus::Scheduled));
    }

    #[test]
    fn test_skeleton_bye_slots_empty_and_auto_advanced() {
        let matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf1 = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 1)
            .unwrap();
        assert_eq!(qf1.player1_id, Some(1));
        assert_eq!(qf1.player2_id, None);

        // Lone occupants advanced one round: player 1 into SF1 slot 1,
        // player 2 into SF2 slot 2.
        let sf1 = matches
            .iter()
            .find(|m| m.round_id == 5 && m.match_number == 1)
            .unwrap();
        assert_eq!(sf1.player1_id, Some(1));
        let sf2 = matches
            .iter()
            .find(|m| m.round_id == 5 && m.match_number == 2)
            .unwrap();
        assert_eq!(sf2.player2_id, Some(2));
    }

    #[test]
    fn test_skeleton_sized_by_highest_position() {
        // 8 entrants spread over a 16-slot grid (seed 2 at the far end):
        // the bracket must cover every occupied position, not just the
        // headcount's minimal size.
        let rows = vec![
            draw_player(1, 1, true),
            draw_player(3, 3, true),
            draw_player(4, 5, true),
            draw_player(5, 7, true),
            draw_player(6, 9, true),
            draw_player(7, 11, true),
            draw_player(8, 13, true),
            draw_player(2, 16, true),
        ];
        let matches = create_match_skeleton(1, &rows, start_date(), 1).unwrap();

        // 16-slot bracket: R16=8, QF=4, SF=2, F=1 starting at round 3.
        assert_eq!(matches.len(), 15);
        assert_eq!(matches.iter().map(|m| m.round_id).min(), Some(3));
        assert_eq!(matches.iter().filter(|m| m.round_id == 3).count(), 8);

        let placed: Vec<PlayerId> = rows
            .iter()
            .map(|r| r.player_id)
            .filter(|&p| matches.iter().any(|m| m.round_id == 3 && m.involves(p)))
            .collect();
        assert_eq!(placed.len(), rows.len(), "every entrant holds a first-round slot");
    }

    #[test]
    fn test_skeleton_rejects_empty_draw() {
        let err = create_match_skeleton(1, &[], start_date(), 1).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_starting_round_by_draw_size() {
        assert_eq!(starting_round_id(8), 4);
        assert_eq!(starting_round_id(16), 3);
        assert_eq!(starting_round_id(32), 2);
        assert_eq!(starting_round_id(64), 1);
    }

    #[test]
    fn test_apply_result_advances_winner_to_correct_slot() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf2_id = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 2)
            .unwrap()
            .match_id;

        let applied = apply_result(
            &mut matches,
            1,
            7,
            &completed_payload(qf2_id, 3),
            &[],
            &DisciplineRules::default(),
        )
        .unwrap();

        // Match 2 feeds round 5 match 1, player2 slot.
        assert_eq!(applied.advanced_to, Some((5, 1, Slot::Player2)));
        let sf1 = matches
            .iter()
            .find(|m| m.round_id == 5 && m.match_number == 1)
            .unwrap();
        assert_eq!(sf1.player2_id, Some(3));
        assert!(applied.new_suspension.is_none());
    }

    #[test]
    fn test_apply_result_final_has_no_next_match() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let final_id = matches
            .iter()
            .find(|m| m.round_id == 6)
            .unwrap()
            .match_id;
        // Fill the final manually.
        {
            let f = matches.iter_mut().find(|m| m.round_id == 6).unwrap();
            f.player1_id = Some(1);
            f.player2_id = Some(2);
        }
        let applied = apply_result(
            &mut matches,
            1,
            7,
            &completed_payload(final_id, 1),
            &[],
            &DisciplineRules::default(),
        )
        .unwrap();
        assert!(applied.advanced_to.is_none());
        let f = matches.iter().find(|m| m.round_id == 6).unwrap();
        assert_eq!(f.winner_id, Some(1));
    }

    #[test]
    fn test_apply_result_unknown_match() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let err = apply_result(
            &mut matches,
            1,
            7,
            &completed_payload(999, 3),
            &[],
            &DisciplineRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_apply_result_invalid_score_leaves_match_untouched() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf2_id = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 2)
            .unwrap()
            .match_id;
        let payload = ResultPayload {
            match_id: qf2_id,
            status: MatchStatus::Completed,
            winner_id: 3,
            score: ScoreCard {
                set1: SetScore::games(6, 5),
                set2: SetScore::games(6, 4),
                ..ScoreCard::blank()
            },
        };
        let err = apply_result(
            &mut matches,
            1,
            7,
            &payload,
            &[],
            &DisciplineRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        let qf2 = matches.iter().find(|m| m.match_id == qf2_id).unwrap();
        assert_eq!(qf2.status, MatchStatus::Scheduled);
        assert!(qf2.winner_id.is_none());
    }

    #[test]
    fn test_walkover_sanctions_loser_for_two_months() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf2_id = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 2)
            .unwrap()
            .match_id;
        let payload = ResultPayload {
            match_id: qf2_id,
            status: MatchStatus::Walkover,
            winner_id: 3,
            score: ScoreCard::blank(),
        };
        let applied = apply_result(
            &mut matches,
            1,
            7,
            &payload,
            &[],
            &DisciplineRules::default(),
        )
        .unwrap();
        let suspension = applied.new_suspension.unwrap();
        assert_eq!(suspension.player_id, 4);
        assert_eq!(suspension.reason, SuspensionReason::Walkover);
        assert_eq!(suspension.suspension_start, start_date());
        assert_eq!(
            suspension.suspension_end,
            NaiveDate::from_ymd_opt(2026, 6, 13).unwrap()
        );
    }

    #[test]
    fn test_disqualification_sanction_is_idempotent() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf2_id = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 2)
            .unwrap()
            .match_id;
        let payload = ResultPayload {
            match_id: qf2_id,
            status: MatchStatus::Disqualified,
            winner_id: 3,
            score: ScoreCard {
                set1: SetScore::games(3, 1),
                ..ScoreCard::blank()
            },
        };
        let first = apply_result(
            &mut matches,
            1,
            7,
            &payload,
            &[],
            &DisciplineRules::default(),
        )
        .unwrap();
        let suspension = first.new_suspension.unwrap();
        assert_eq!(suspension.reason, SuspensionReason::Disqualified);
        assert_eq!(
            suspension.suspension_end,
            NaiveDate::from_ymd_opt(2026, 10, 13).unwrap()
        );

        // Re-applying the same event with the suspension on record adds
        // nothing.
        let second = apply_result(
            &mut matches,
            1,
            7,
            &payload,
            std::slice::from_ref(&suspension),
            &DisciplineRules::default(),
        )
        .unwrap();
        assert!(second.new_suspension.is_none());
    }

    #[test]
    fn test_sanction_winner_must_be_participant() {
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        let qf2_id = matches
            .iter()
            .find(|m| m.round_id == 4 && m.match_number == 2)
            .unwrap()
            .match_id;
        let payload = ResultPayload {
            match_id: qf2_id,
            status: MatchStatus::Walkover,
            winner_id: 99,
            score: ScoreCard::blank(),
        };
        let err = apply_result(
            &mut matches,
            1,
            7,
            &payload,
            &[],
            &DisciplineRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_full_round_trip_through_bracket() {
        // Play the whole 6-player draw to a winner.
        let mut matches = create_match_skeleton(1, &six_player_draw(), start_date(), 1).unwrap();
        loop {
            let next = matches.iter().find_map(|m| {
                (m.status == MatchStatus::Scheduled
                    && m.player1_id.is_some()
                    && m.player2_id.is_some())
                .then(|| (m.match_id, m.player1_id.unwrap()))
            });
            let Some((match_id, winner)) = next else { break };
            apply_result(
                &mut matches,
                1,
                7,
                &completed_payload(match_id, winner),
                &[],
                &DisciplineRules::default(),
            )
            .unwrap();
        }
        let final_match = matches.iter().find(|m| m.round_id == 6).unwrap();
        assert_eq!(final_match.status, MatchStatus::Completed);
        assert!(final_match.winner_id.is_some());
        // Every playable match got a result.
        assert!(matches
            .iter()
            .all(|m| m.status == MatchStatus::Completed
                || m.player1_id.is_none()
                || m.player2_id.is_none()));
    }
}
