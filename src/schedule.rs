//! Match date assignment.
//!
//! Scheduling only: bracket structure and results are never touched here.
//! Round r is aimed at tournament start + (r - 1) days; a match is pushed
//! forward a day at a time while either player is already booked on the
//! target date, so nobody plays twice on the same day.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::models::{Match, PlayerId};

/// Assign `match_date` across a draw's matches.
///
/// Matches are visited in (round, match number) order so earlier rounds book
/// their days first. Matches with an unfilled slot are left untouched; they
/// get scheduled once the bracket fills.
pub fn schedule_match_dates(matches: &mut [Match], tournament_start_date: NaiveDate) {
    let mut order: Vec<usize> = (0..matches.len()).collect();
    order.sort_by_key(|&i| {
        (
            matches[i].round_id,
            matches[i].match_number,
            matches[i].match_id,
        )
    });

    let mut booked: HashMap<PlayerId, NaiveDate> = HashMap::new();
    for i in order {
        let (Some(p1), Some(p2)) = (matches[i].player1_id, matches[i].player2_id) else {
            continue;
        };

        let offset = i64::from(matches[i].round_id.saturating_sub(1));
        let mut desired = tournament_start_date + Duration::days(offset);
        while booked.get(&p1) == Some(&desired) || booked.get(&p2) == Some(&desired) {
            desired += Duration::days(1);
        }

        matches[i].match_date = desired;
        booked.insert(p1, desired);
        booked.insert(p2, desired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchStatus, ScoreCard};
    use crate::score::validate_player_schedule;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 13).unwrap()
    }

    fn mk(match_id: i64, round_id: u32, match_number: u32, p1: Option<i64>, p2: Option<i64>) -> Match {
        Match {
            match_id,
            draw_id: 1,
            round_id,
            match_number,
            player1_id: p1,
            player2_id: p2,
            match_date: start(),
            status: MatchStatus::Scheduled,
            winner_id: None,
            score: ScoreCard::blank(),
        }
    }

    #[test]
    fn test_rounds_progress_across_the_week() {
        let mut matches = vec![
            mk(1, 4, 1, Some(1), Some(2)),
            mk(2, 4, 2, Some(3), Some(4)),
            mk(3, 5, 1, Some(1), Some(3)),
        ];
        schedule_match_dates(&mut matches, start());
        assert_eq!(matches[0].match_date, start() + Duration::days(3));
        assert_eq!(matches[1].match_date, start() + Duration::days(3));
        assert_eq!(matches[2].match_date, start() + Duration::days(4));
    }

    #[test]
    fn test_clash_pushes_match_forward() {
        // Two round-5 matches sharing player 1 cannot land on the same day.
        let mut matches = vec![
            mk(1, 5, 1, Some(1), Some(2)),
            mk(2, 5, 2, Some(1), Some(3)),
        ];
        schedule_match_dates(&mut matches, start());
        assert_ne!(matches[0].match_date, matches[1].match_date);
        assert!(validate_player_schedule(&matches).is_valid());
    }

    #[test]
    fn test_unfilled_matches_left_alone() {
        let mut matches = vec![mk(1, 4, 1, Some(1), None), mk(2, 5, 1, None, None)];
        schedule_match_dates(&mut matches, start());
        assert_eq!(matches[0].match_date, start());
        assert_eq!(matches[1].match_date, start());
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let build = || {
            vec![
                mk(3, 5, 1, Some(1), Some(3)),
                mk(1, 4, 1, Some(1), Some(2)),
                mk(2, 4, 2, Some(3), Some(4)),
            ]
        };
        let mut a = build();
        let mut b = build();
        schedule_match_dates(&mut a, start());
        schedule_match_dates(&mut b, start());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.match_date, y.match_date);
        }
    }
}
