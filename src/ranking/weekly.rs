//! Weekly ranking computation.
//!
//! A ranking for ISO week N counts tournaments played in weeks N-52 .. N-1
//! inclusive, sums each player's best four results, and ranks players within
//! every (age category, gender) pair. Equal totals receive distinct
//! consecutive ranks in encounter order; no shared ranks are published.

use std::collections::HashMap;

use tracing::info;

use crate::calendar::{ranking_window, IsoWeek};
use crate::error::EngineResult;
use crate::models::{
    AgeCategoryId, GenderId, PlayerId, PointsHistoryRecord, TournamentId, WeeklyRankingRecord,
};
use crate::rules::RankingRules;

/// Sum of the best results, descending, capped at `best_results_counted`.
fn best_results_total(points: &[i64], best_results_counted: usize) -> i64 {
    let mut sorted = points.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.iter().take(best_results_counted).sum()
}

/// Compute the full ranking table for one publication week.
///
/// `tournament_weeks` maps each tournament to the ISO week it was played in;
/// history rows whose tournament is unknown or out of window are skipped, as
/// are players missing from the gender mapping.
pub fn weekly_ranking(
    week: IsoWeek,
    history: &[PointsHistoryRecord],
    tournament_weeks: &HashMap<TournamentId, IsoWeek>,
    player_gender: &HashMap<PlayerId, GenderId>,
    rules: &RankingRules,
) -> EngineResult<Vec<WeeklyRankingRecord>> {
    let (window_start, window_end) = ranking_window(week, rules.rolling_weeks)?;

    // Bucket in-window results per (player, age category, gender), keeping
    // bucket encounter order for deterministic tie ordering.
    let mut buckets: Vec<((PlayerId, AgeCategoryId, GenderId), Vec<i64>)> = Vec::new();
    let mut index: HashMap<(PlayerId, AgeCategoryId, GenderId), usize> = HashMap::new();

    for record in history {
        let Some(&tournament_week) = tournament_weeks.get(&record.tournament_id) else {
            continue;
        };
        if tournament_week < window_start || tournament_week > window_end {
            continue;
        }
        let Some(&gender_id) = player_gender.get(&record.player_id) else {
            continue;
        };
        let key = (record.player_id, record.age_category_id, gender_id);
        match index.get(&key) {
            Some(&i) => buckets[i].1.push(record.points_earned),
            None => {
                index.insert(key, buckets.len());
                buckets.push((key, vec![record.points_earned]));
            }
        }
    }

    let mut rankings: Vec<WeeklyRankingRecord> = buckets
        .into_iter()
        .map(|((player_id, age_category_id, gender_id), points)| WeeklyRankingRecord {
            player_id,
            age_category_id,
            gender_id,
            ranking_year: week.year,
            ranking_week: week.week,
            total_points: best_results_total(&points, rules.best_results_counted),
            rank_position: 0,
        })
        .collect();

    // Dense 1-based ranks per (age category, gender). The sort is stable, so
    // equal totals keep encounter order.
    let mut categories: Vec<(AgeCategoryId, GenderId)> = rankings
        .iter()
        .map(|r| (r.age_category_id, r.gender_id))
        .collect();
    categories.sort_unstable();
    categories.dedup();

    for (age_category_id, gender_id) in categories {
        let mut members: Vec<usize> = rankings
            .iter()
            .enumerate()
            .filter(|(_, r)| r.age_category_id == age_category_id && r.gender_id == gender_id)
            .map(|(i, _)| i)
            .collect();
        members.sort_by_key(|&i| std::cmp::Reverse(rankings[i].total_points));
        for (rank, &i) in members.iter().enumerate() {
            rankings[i].rank_position = rank as u32 + 1;
        }
    }

    info!(
        year = week.year,
        week = week.week,
        rows = rankings.len(),
        "weekly ranking computed"
    );
    Ok(rankings)
}
