//! Score validation rules.
//!
//! Pure checks only: nothing here touches storage. A completed set score
//! comes from a fixed whitelist (6-0..6-4, 7-5, 7-6 and mirrors); 7-6 sets
//! carry tie-break points won by two; retired and disqualified matches must
//! show a genuinely truncated scoreline.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{EngineError, EngineResult};
use crate::models::{Match, MatchStatus, ScoreCard, ScorePair, SetScore};

/// Smallest draw a tournament may run with.
pub const MIN_DRAW_PLAYERS: u32 = 6;
/// Largest supported draw.
pub const MAX_DRAW_PLAYERS: u32 = 64;

/// Accumulated validation findings for one score card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreReport {
    pub errors: Vec<String>,
}

impl ScoreReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a result, carrying all findings.
    pub fn into_result(self) -> EngineResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self.errors))
        }
    }

    fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Completed set score whitelist: 6-0..6-4, 7-5, 7-6 and mirrors.
pub fn is_valid_set_score(games: ScorePair) -> bool {
    const VALID: [(u8, u8); 7] = [(6, 0), (6, 1), (6, 2), (6, 3), (6, 4), (7, 5), (7, 6)];
    VALID.contains(&(games.p1, games.p2)) || VALID.contains(&(games.p2, games.p1))
}

/// Partial set score: both sides 0..=6, unequal, and not a completed score.
/// 6-6 is excluded here; it is only reachable with tie-break points attached.
pub fn is_partial_set_score(games: ScorePair) -> bool {
    games.p1 <= 6
        && games.p2 <= 6
        && games.p1 != games.p2
        && !is_valid_set_score(games)
}

/// Whether a set score mandates tie-break points.
pub fn requires_tiebreak(games: ScorePair) -> bool {
    (games.p1 == 7 && games.p2 == 6) || (games.p1 == 6 && games.p2 == 7)
}

/// Completed tie-break: winner reached at least 7, margin at least 2.
pub fn is_valid_tiebreak(tb: ScorePair) -> bool {
    tb.p1.max(tb.p2) >= 7 && tb.p1.abs_diff(tb.p2) >= 2
}

/// Partial tie-break: unequal points that do not yet complete the tie-break.
pub fn is_partial_tiebreak(tb: ScorePair) -> bool {
    tb.p1 != tb.p2 && !is_valid_tiebreak(tb)
}

/// Completed super tie-break: winner reached at least 10, margin at least 2.
pub fn is_valid_super_tiebreak(stb: ScorePair) -> bool {
    stb.p1.max(stb.p2) >= 10 && stb.p1.abs_diff(stb.p2) >= 2
}

/// Partial super tie-break.
pub fn is_partial_super_tiebreak(stb: ScorePair) -> bool {
    stb.p1 != stb.p2 && !is_valid_super_tiebreak(stb)
}

/// Whether the first two sets went one apiece.
pub fn sets_are_split(score: &ScoreCard) -> bool {
    match (score.set1.games, score.set2.games) {
        (Some(s1), Some(s2)) => s1.leader_slot() != s2.leader_slot(),
        _ => false,
    }
}

fn fmt_pair(pair: ScorePair) -> String {
    format!("{}-{}", pair.p1, pair.p2)
}

/// Validate one completed-format set: whitelist score, tie-break exactly when
/// the score is 7-6.
fn validate_completed_set(report: &mut ScoreReport, label: &str, set: &SetScore) {
    let Some(games) = set.games else {
        if set.tiebreak.is_some() {
            report.push(format!("{label} tie-break values require {label} games"));
        }
        return;
    };

    if !is_valid_set_score(games) {
        report.push(format!("Invalid {label} score: {}", fmt_pair(games)));
    }

    if requires_tiebreak(games) {
        match set.tiebreak {
            None => report.push(format!(
                "{label} score {} requires tie-break",
                fmt_pair(games)
            )),
            Some(tb) if !is_valid_tiebreak(tb) => {
                report.push(format!("Invalid {label} tie-break: {}", fmt_pair(tb)));
            }
            Some(_) => {}
        }
    } else if set.tiebreak.is_some() {
        report.push(format!(
            "{label} score {} should not have tie-break",
            fmt_pair(games)
        ));
    }
}

/// Validate a set of a retired/disqualified match.
///
/// Accepts completed scores, partial scores and a 6-6 score with tie-break
/// points (the retirement happened mid-tie-break). Returns
/// `(present, incomplete)`.
fn validate_truncated_set(report: &mut ScoreReport, label: &str, set: &SetScore) -> (bool, bool) {
    let Some(games) = set.games else {
        if set.tiebreak.is_some() {
            report.push(format!("{label} tie-break values require {label} games"));
        }
        return (false, false);
    };

    if is_valid_set_score(games) {
        if requires_tiebreak(games) {
            match set.tiebreak {
                None => {
                    report.push(format!(
                        "{label} score {} requires tie-break",
                        fmt_pair(games)
                    ));
                    return (true, true);
                }
                Some(tb) if !is_valid_tiebreak(tb) => {
                    report.push(format!("Invalid {label} tie-break: {}", fmt_pair(tb)));
                    return (true, true);
                }
                Some(_) => {}
            }
        } else if set.tiebreak.is_some() {
            report.push(format!(
                "{label} score {} should not have tie-break",
                fmt_pair(games)
            ));
            return (true, true);
        }
        return (true, false);
    }

    if is_partial_set_score(games) {
        if set.tiebreak.is_some() {
            report.push(format!(
                "{label} partial score {} must not have tie-break",
                fmt_pair(games)
            ));
        }
        return (true, true);
    }

    // Retired during the tie-break: 6-6 with partial or complete points.
    if games.p1 == 6 && games.p2 == 6 {
        match set.tiebreak {
            None => report.push(format!(
                "{label} score 6-6 requires tie-break points for a truncated match"
            )),
            Some(tb) if !is_valid_tiebreak(tb) && !is_partial_tiebreak(tb) => {
                report.push(format!("Invalid {label} tie-break: {}", fmt_pair(tb)));
            }
            Some(_) => {}
        }
        return (true, true);
    }

    report.push(format!(
        "Invalid {label} score for truncated match: {}",
        fmt_pair(games)
    ));
    (true, true)
}

fn validate_truncated(report: &mut ScoreReport, status: MatchStatus, score: &ScoreCard) {
    let status_name = match status {
        MatchStatus::Disqualified => "Disqualified",
        _ => "Retired",
    };

    if score.set1.games.is_none() {
        report.push(format!("{status_name} match must have at least set 1 scores"));
        return;
    }

    if score.set3.is_present() && score.super_tiebreak.is_some() {
        report.push("Set 3 cannot have both normal set and super tie-break");
        return;
    }

    let (_, set1_incomplete) = validate_truncated_set(report, "Set 1", &score.set1);
    let (set2_present, set2_incomplete) = validate_truncated_set(report, "Set 2", &score.set2);

    let (set3_present, set3_incomplete) = if let Some(stb) = score.super_tiebreak {
        let incomplete = if is_valid_super_tiebreak(stb) {
            false
        } else if is_partial_super_tiebreak(stb) {
            true
        } else {
            report.push(format!("Invalid Set 3 super tie-break: {}", fmt_pair(stb)));
            true
        };
        (true, incomplete)
    } else {
        validate_truncated_set(report, "Set 3", &score.set3)
    };

    // No play after the retirement point.
    if set1_incomplete && (set2_present || set3_present) {
        report.push(format!("{status_name} in Set 1: Set 2 and Set 3 must be NULL"));
    }
    if !set1_incomplete && set2_incomplete && set3_present {
        report.push(format!("{status_name} in Set 2: Set 3 must be NULL"));
    }

    // Two complete sets and nothing truncated reads as a completed match.
    if !(set1_incomplete || set2_incomplete || set3_incomplete) && set2_present {
        report.push(format!(
            "{status_name} match must contain an incomplete set/tie-break or truncated later sets"
        ));
    }
}

fn validate_completed(report: &mut ScoreReport, score: &ScoreCard) {
    if score.set1.games.is_none() || score.set2.games.is_none() {
        report.push("Completed match must have at least 2 sets");
    }

    validate_completed_set(report, "Set 1", &score.set1);
    validate_completed_set(report, "Set 2", &score.set2);
    validate_completed_set(report, "Set 3", &score.set3);

    if let Some(stb) = score.super_tiebreak {
        if !is_valid_super_tiebreak(stb) {
            report.push(format!("Invalid super tie-break: {}", fmt_pair(stb)));
        }
    }

    if sets_are_split(score) {
        let has_normal_set3 = score.set3.games.is_some();
        let has_super_tiebreak = score.super_tiebreak.is_some();
        if !has_normal_set3 && !has_super_tiebreak {
            report.push("Third set required when first two sets are split");
        }
        if has_normal_set3 && has_super_tiebreak {
            report.push("Set 3 cannot have both normal set and super tie-break");
        }
    } else if score.set1.games.is_some() && score.set2.games.is_some() {
        if score.set3.is_present() || score.super_tiebreak.is_some() {
            report.push("Third set not allowed when the first two sets are not split");
        }
    }
}

/// Validate a score card against a match status.
pub fn validate(score: &ScoreCard, status: MatchStatus) -> ScoreReport {
    let mut report = ScoreReport::default();

    match status {
        MatchStatus::Scheduled => {
            if !score.is_blank() {
                report.push("Scheduled match cannot have scores");
            }
        }
        MatchStatus::Cancelled => {
            if !score.is_blank() {
                report.push("Cancelled match cannot have scores");
            }
        }
        // No constraints: the match never happened, any leftover fields pass.
        MatchStatus::Walkover => {}
        MatchStatus::Completed => validate_completed(&mut report, score),
        MatchStatus::Retired | MatchStatus::Disqualified => {
            validate_truncated(&mut report, status, score);
        }
    }

    report
}

/// No player may be scheduled twice on the same day.
pub fn validate_player_schedule(matches: &[Match]) -> ScoreReport {
    let mut report = ScoreReport::default();
    let mut per_day: HashMap<(i64, NaiveDate), u32> = HashMap::new();

    for m in matches {
        let (Some(p1), Some(p2)) = (m.player1_id, m.player2_id) else {
            continue;
        };
        *per_day.entry((p1, m.match_date)).or_default() += 1;
        *per_day.entry((p2, m.match_date)).or_default() += 1;
    }

    let mut violations: Vec<_> = per_day
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .collect();
    violations.sort_by_key(|&((player_id, date), _)| (player_id, date));
    for ((player_id, date), count) in violations {
        report.push(format!(
            "Player {player_id} has {count} matches on {date} (max 1 per day)"
        ));
    }

    report
}

/// Draw size bounds: at least 6 entrants, at most 64.
pub fn validate_draw_size(num_players: u32) -> EngineResult<()> {
    if num_players < MIN_DRAW_PLAYERS {
        return Err(EngineError::validation(format!(
            "Draw has {num_players} players. Minimum {MIN_DRAW_PLAYERS} required (tournament cancelled)"
        )));
    }
    if num_players > MAX_DRAW_PLAYERS {
        return Err(EngineError::validation(format!(
            "Draw has {num_players} players. Maximum {MAX_DRAW_PLAYERS} allowed"
        )));
    }
    Ok(())
}
