//! Match model and score card.
//!
//! Score fields are explicit typed options rather than a free-form field map:
//! a set either has both game values or none, which removes the half-present
//! shapes the validator would otherwise have to reject.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DrawId, MatchId, PlayerId, RoundId};

/// Lifecycle status of a match.
///
/// `Scheduled` is the only non-terminal state; every other status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    Completed,
    /// Opponent failed to appear after the draw was published.
    Walkover,
    Retired,
    Cancelled,
    Disqualified,
}

impl MatchStatus {
    /// Whether this status ends the match.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Scheduled)
    }
}

/// A pair of per-player values (games or tie-break points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    pub p1: u8,
    pub p2: u8,
}

impl ScorePair {
    pub fn new(p1: u8, p2: u8) -> Self {
        Self { p1, p2 }
    }

    /// 1 if player 1 leads, 2 otherwise.
    pub fn leader_slot(&self) -> Slot {
        if self.p1 > self.p2 {
            Slot::Player1
        } else {
            Slot::Player2
        }
    }

    fn swapped(self) -> Self {
        Self {
            p1: self.p2,
            p2: self.p1,
        }
    }
}

/// One set: game score plus optional tie-break points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub games: Option<ScorePair>,
    pub tiebreak: Option<ScorePair>,
}

impl SetScore {
    pub fn games(p1: u8, p2: u8) -> Self {
        Self {
            games: Some(ScorePair::new(p1, p2)),
            tiebreak: None,
        }
    }

    pub fn with_tiebreak(p1: u8, p2: u8, tb1: u8, tb2: u8) -> Self {
        Self {
            games: Some(ScorePair::new(p1, p2)),
            tiebreak: Some(ScorePair::new(tb1, tb2)),
        }
    }

    pub fn is_present(&self) -> bool {
        self.games.is_some() || self.tiebreak.is_some()
    }

    fn swapped(self) -> Self {
        Self {
            games: self.games.map(ScorePair::swapped),
            tiebreak: self.tiebreak.map(ScorePair::swapped),
        }
    }
}

/// Which side of a match a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Player1,
    Player2,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::Player1 => Slot::Player2,
            Slot::Player2 => Slot::Player1,
        }
    }
}

/// Full score record for a best-of-three match.
///
/// The third set is either a normal set (`set3`) or a super tie-break
/// (`super_tiebreak`); the validator rejects cards carrying both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub set1: SetScore,
    pub set2: SetScore,
    pub set3: SetScore,
    pub super_tiebreak: Option<ScorePair>,
}

impl ScoreCard {
    /// An all-empty card, as required for scheduled/cancelled/walkover rows.
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        !self.set1.is_present()
            && !self.set2.is_present()
            && !self.set3.is_present()
            && self.super_tiebreak.is_none()
    }

    pub fn sets(&self) -> [&SetScore; 3] {
        [&self.set1, &self.set2, &self.set3]
    }

    /// Swap every player1/player2 value pairwise.
    ///
    /// Used by the score generator to force a required winner while keeping
    /// the sampled scoreline shape.
    pub fn swap_sides(&self) -> Self {
        Self {
            set1: self.set1.swapped(),
            set2: self.set2.swapped(),
            set3: self.set3.swapped(),
            super_tiebreak: self.super_tiebreak.map(ScorePair::swapped),
        }
    }

    /// Sets won per side, counting only sets with a game score.
    pub fn sets_won(&self) -> (u32, u32) {
        let mut won = (0, 0);
        for set in self.sets() {
            if let Some(games) = set.games {
                match games.leader_slot() {
                    Slot::Player1 => won.0 += 1,
                    Slot::Player2 => won.1 += 1,
                }
            }
        }
        won
    }
}

impl fmt::Display for ScoreCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for set in self.sets() {
            let Some(games) = set.games else { break };
            let mut s = format!("{}-{}", games.p1, games.p2);
            if let Some(tb) = set.tiebreak {
                s.push_str(&format!("({}-{})", tb.p1, tb.p2));
            }
            parts.push(s);
        }
        if let Some(stb) = self.super_tiebreak {
            parts.push(format!("[{}-{}]", stb.p1, stb.p2));
        }
        write!(f, "{}", parts.join(" "))
    }
}

fn parse_pair(s: &str) -> Option<ScorePair> {
    let (a, b) = s.split_once('-')?;
    Some(ScorePair::new(a.parse().ok()?, b.parse().ok()?))
}

impl ScoreCard {
    /// Parse the display format back into a card (e.g. "7-6(7-5) 6-2" or
    /// "6-4 4-6 [10-7]"). An empty string is a blank card.
    pub fn parse(s: &str) -> Option<Self> {
        let mut card = ScoreCard::blank();
        let mut set_idx = 0;
        for token in s.split_whitespace() {
            if card.super_tiebreak.is_some() {
                // Nothing may follow the super tie-break.
                return None;
            }
            if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                card.super_tiebreak = Some(parse_pair(inner)?);
                continue;
            }
            let set = match token.split_once('(') {
                Some((games, tb)) => SetScore {
                    games: Some(parse_pair(games)?),
                    tiebreak: Some(parse_pair(tb.strip_suffix(')')?)?),
                },
                None => SetScore {
                    games: Some(parse_pair(token)?),
                    tiebreak: None,
                },
            };
            match set_idx {
                0 => card.set1 = set,
                1 => card.set2 = set,
                2 => card.set3 = set,
                _ => return None,
            }
            set_idx += 1;
        }
        Some(card)
    }
}

/// One bracket match.
///
/// `round_id` is stage-coded (1 = R64 .. 6 = Final) and increases by exactly
/// one per round within a draw. `match_number` is round-local and 1-based; the
/// winner of match m feeds match ceil(m/2) in the next round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub draw_id: DrawId,
    pub round_id: RoundId,
    pub match_number: u32,
    pub player1_id: Option<PlayerId>,
    pub player2_id: Option<PlayerId>,
    pub match_date: NaiveDate,
    pub status: MatchStatus,
    pub winner_id: Option<PlayerId>,
    pub score: ScoreCard,
}

impl Match {
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player1_id == Some(player_id) || self.player2_id == Some(player_id)
    }

    /// The player occupying a slot, if any.
    pub fn player_in(&self, slot: Slot) -> Option<PlayerId> {
        match slot {
            Slot::Player1 => self.player1_id,
            Slot::Player2 => self.player2_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_sides_flips_every_pair() {
        let card = ScoreCard {
            set1: SetScore::with_tiebreak(7, 6, 7, 4),
            set2: SetScore::games(2, 6),
            set3: SetScore::default(),
            super_tiebreak: Some(ScorePair::new(10, 7)),
        };
        let swapped = card.swap_sides();
        assert_eq!(swapped.set1, SetScore::with_tiebreak(6, 7, 4, 7));
        assert_eq!(swapped.set2, SetScore::games(6, 2));
        assert_eq!(swapped.super_tiebreak, Some(ScorePair::new(7, 10)));
    }

    #[test]
    fn test_sets_won_ignores_super_tiebreak() {
        let card = ScoreCard {
            set1: SetScore::games(6, 3),
            set2: SetScore::games(4, 6),
            set3: SetScore::default(),
            super_tiebreak: Some(ScorePair::new(10, 8)),
        };
        assert_eq!(card.sets_won(), (1, 1));
    }

    #[test]
    fn test_display_formats_tiebreaks() {
        let card = ScoreCard {
            set1: SetScore::with_tiebreak(7, 6, 7, 5),
            set2: SetScore::games(6, 2),
            set3: SetScore::default(),
            super_tiebreak: None,
        };
        assert_eq!(card.to_string(), "7-6(7-5) 6-2");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for s in ["7-6(7-5) 6-2", "6-4 4-6 [10-7]", "6-0 6-0", ""] {
            let card = ScoreCard::parse(s).unwrap();
            assert_eq!(card.to_string(), s);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(ScoreCard::parse("6-4 [10-7] 6-2").is_none());
        assert!(ScoreCard::parse("6-4 6-3 4-6 6-1").is_none());
        assert!(ScoreCard::parse("six-four").is_none());
        assert!(ScoreCard::parse("7-6(7-5").is_none());
    }

    #[test]
    fn test_blank_card() {
        assert!(ScoreCard::blank().is_blank());
        assert!(!ScoreCard {
            set1: SetScore::games(1, 0),
            ..ScoreCard::blank()
        }
        .is_blank());
    }
}
