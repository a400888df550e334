//! Points history and weekly ranking records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AgeCategoryId, GenderId, PlayerId, TournamentId};

/// The furthest stage a player reached in a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageResult {
    Winner,
    Finalist,
    Semifinalist,
    Quarterfinalist,
    LastSixteen,
    LastThirtyTwo,
    LastSixtyFour,
}

impl StageResult {
    /// Stage for a loss `distance` rounds before the final.
    ///
    /// 1 => semifinalist, 2 => quarterfinalist, ...; anything deeper than 5
    /// collapses to last-64, the lowest stage the points tables know.
    pub fn from_distance_to_final(distance: u32) -> Self {
        match distance {
            1 => StageResult::Semifinalist,
            2 => StageResult::Quarterfinalist,
            3 => StageResult::LastSixteen,
            4 => StageResult::LastThirtyTwo,
            _ => StageResult::LastSixtyFour,
        }
    }
}

/// One player's result in one draw, with the points it earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsHistoryRecord {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub age_category_id: AgeCategoryId,
    pub stage_result: StageResult,
    pub points_earned: i64,
    pub tournament_end_date: NaiveDate,
}

/// One row of a published weekly ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyRankingRecord {
    pub player_id: PlayerId,
    pub age_category_id: AgeCategoryId,
    pub gender_id: GenderId,
    pub ranking_year: i32,
    pub ranking_week: u32,
    pub total_points: i64,
    /// Dense rank within (age_category, gender), 1-based. Equal totals get
    /// distinct consecutive ranks in encounter order.
    pub rank_position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_distance() {
        assert_eq!(
            StageResult::from_distance_to_final(1),
            StageResult::Semifinalist
        );
        assert_eq!(
            StageResult::from_distance_to_final(4),
            StageResult::LastThirtyTwo
        );
        assert_eq!(
            StageResult::from_distance_to_final(9),
            StageResult::LastSixtyFour
        );
    }
}
