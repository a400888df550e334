//! Disciplinary suspension model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{PlayerId, TournamentId};

/// Why a suspension was imposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SuspensionReason {
    /// No-show / default after the draw was published (2 months).
    Walkover,
    /// Disqualification during a started match (6 months).
    Disqualified,
}

/// One suspension row; at most one per (player, tournament, reason).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSuspension {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub reason: SuspensionReason,
    pub suspension_start: NaiveDate,
    pub suspension_end: NaiveDate,
}

impl PlayerSuspension {
    /// Natural key for idempotent insertion.
    pub fn natural_key(&self) -> (PlayerId, TournamentId, SuspensionReason) {
        (self.player_id, self.tournament_id, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suspension(player_id: PlayerId, reason: SuspensionReason) -> PlayerSuspension {
        PlayerSuspension {
            player_id,
            tournament_id: 42,
            reason,
            suspension_start: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            suspension_end: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
        }
    }

    #[test]
    fn test_suspension_equality_follows_fields() {
        let a = suspension(7, SuspensionReason::Walkover);
        assert_eq!(a, a.clone());
        assert_ne!(a, suspension(8, SuspensionReason::Walkover));
        assert_ne!(a, suspension(7, SuspensionReason::Disqualified));
    }

    #[test]
    fn test_natural_key_ignores_dates() {
        let a = suspension(7, SuspensionReason::Walkover);
        let mut b = a.clone();
        b.suspension_end = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(a.natural_key(), b.natural_key());
        assert_ne!(a, b);
    }
}
