//! Synthetic score generation.
//!
//! Every scoreline produced here passes [`super::validate`] for the status it
//! was generated for. Distributions come from the rules policy; all sampling
//! flows through the injected random source so simulations are reproducible
//! from a seed.

use rand::seq::SliceRandom;
use rand::Rng;

use super::validate::{is_valid_set_score, is_valid_super_tiebreak, is_valid_tiebreak};
use crate::error::{EngineError, EngineResult};
use crate::models::{ScoreCard, ScorePair, SetScore, Slot};
use crate::rules::RulesPolicy;

/// Attempt cap for resampling the first two sets until they split. Guards
/// against pathological weight tables where one side can never lose a set.
pub const MAX_SPLIT_ATTEMPTS: u32 = 64;

/// A sampled scoreline and the side it declares the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedScore {
    pub score: ScoreCard,
    pub winner: Slot,
}

impl GeneratedScore {
    /// Force a specific winner, swapping every per-player value pairwise if
    /// the sampled winner is on the wrong side.
    pub fn with_winner(self, winner: Slot) -> Self {
        if self.winner == winner {
            self
        } else {
            Self {
                score: self.score.swap_sides(),
                winner,
            }
        }
    }
}

/// Weighted score sampler bound to one rules policy.
pub struct ScoreGenerator<'a> {
    policy: &'a RulesPolicy,
}

impl<'a> ScoreGenerator<'a> {
    pub fn new(policy: &'a RulesPolicy) -> Self {
        Self { policy }
    }

    /// Tie-break points: deuce table past 7-5, normal table otherwise.
    fn sample_tiebreak_points<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<ScorePair> {
        if rng.gen_bool(self.policy.probabilities.tiebreak_deuce) {
            self.policy.scores.tiebreak_deuce.sample(rng)
        } else {
            self.policy.scores.tiebreak_normal.sample(rng)
        }
    }

    fn sample_super_tiebreak_points<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> EngineResult<ScorePair> {
        if rng.gen_bool(self.policy.probabilities.super_tiebreak_deuce) {
            self.policy.scores.super_tiebreak_deuce.sample(rng)
        } else {
            self.policy.scores.super_tiebreak_normal.sample(rng)
        }
    }

    /// One completed set: 7-6 with tie-break points at the configured rate,
    /// a weighted normal score otherwise. The winning side is a fair coin so
    /// the two slots stay exchangeable before winner forcing.
    fn sample_completed_set<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<SetScore> {
        let player1_wins = rng.gen_bool(0.5);
        if rng.gen_bool(self.policy.probabilities.set_tiebreak) {
            let tb = self.sample_tiebreak_points(rng)?;
            return Ok(if player1_wins {
                SetScore::with_tiebreak(7, 6, tb.p1, tb.p2)
            } else {
                SetScore::with_tiebreak(6, 7, tb.p2, tb.p1)
            });
        }
        let games = self.policy.scores.normal_set.sample(rng)?;
        Ok(if player1_wins {
            SetScore::games(games.p1, games.p2)
        } else {
            SetScore::games(games.p2, games.p1)
        })
    }

    /// First two sets guaranteed to split one apiece, within the attempt cap.
    fn sample_split_opening_sets<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> EngineResult<(SetScore, SetScore)> {
        for _ in 0..MAX_SPLIT_ATTEMPTS {
            let set1 = self.sample_completed_set(rng)?;
            let set2 = self.sample_completed_set(rng)?;
            let (s1, s2) = (set1.games.expect("completed set"), set2.games.expect("completed set"));
            if s1.leader_slot() != s2.leader_slot() {
                return Ok((set1, set2));
            }
        }
        Err(EngineError::Configuration(format!(
            "failed to sample split opening sets within {MAX_SPLIT_ATTEMPTS} attempts"
        )))
    }

    /// A completed best-of-three match.
    pub fn completed<R: Rng + ?Sized>(
        &self,
        has_super_tiebreak: bool,
        rng: &mut R,
    ) -> EngineResult<GeneratedScore> {
        let set1 = self.sample_completed_set(rng)?;
        let set2 = self.sample_completed_set(rng)?;
        let w1 = set1.games.expect("completed set").leader_slot();
        let w2 = set2.games.expect("completed set").leader_slot();

        if w1 == w2 {
            return Ok(GeneratedScore {
                score: ScoreCard {
                    set1,
                    set2,
                    ..ScoreCard::blank()
                },
                winner: w1,
            });
        }

        // Split sets: the third-set format is fixed per draw, never random.
        if has_super_tiebreak {
            let stb = self.sample_super_tiebreak_points(rng)?;
            return Ok(GeneratedScore {
                score: ScoreCard {
                    set1,
                    set2,
                    super_tiebreak: Some(stb),
                    ..ScoreCard::blank()
                },
                winner: stb.leader_slot(),
            });
        }

        let set3 = self.sample_completed_set(rng)?;
        let winner = set3.games.expect("completed set").leader_slot();
        Ok(GeneratedScore {
            score: ScoreCard {
                set1,
                set2,
                set3,
                super_tiebreak: None,
            },
            winner,
        })
    }

    /// A match ended by retirement in set 1, 2 or 3.
    pub fn retired<R: Rng + ?Sized>(
        &self,
        has_super_tiebreak: bool,
        rng: &mut R,
    ) -> EngineResult<GeneratedScore> {
        self.truncated(
            has_super_tiebreak,
            self.policy.probabilities.retire_in_tiebreak,
            rng,
        )
    }

    /// A match ended by disqualification. Same shape as a retirement with the
    /// disqualification tie-break rate; a partial game score is never 0-0, so
    /// the match always shows visible progress.
    pub fn disqualified<R: Rng + ?Sized>(
        &self,
        has_super_tiebreak: bool,
        rng: &mut R,
    ) -> EngineResult<GeneratedScore> {
        self.truncated(
            has_super_tiebreak,
            self.policy.probabilities.dq_in_tiebreak,
            rng,
        )
    }

    fn truncated<R: Rng + ?Sized>(
        &self,
        has_super_tiebreak: bool,
        in_tiebreak_prob: f64,
        rng: &mut R,
    ) -> EngineResult<GeneratedScore> {
        let ending_set = rng.gen_range(1..=3u8);

        // Sets before the ending one are fully completed.
        let (set1, set2) = match ending_set {
            1 => (SetScore::default(), SetScore::default()),
            2 => (self.sample_completed_set(rng)?, SetScore::default()),
            // A third set is only reachable at one set apiece.
            _ => self.sample_split_opening_sets(rng)?,
        };

        if ending_set == 3 && has_super_tiebreak {
            let stb = partial_super_tiebreak_points(rng);
            return Ok(GeneratedScore {
                score: ScoreCard {
                    set1,
                    set2,
                    super_tiebreak: Some(stb),
                    ..ScoreCard::blank()
                },
                winner: stb.leader_slot(),
            });
        }

        // The ending set is either stopped mid-set or mid-tie-break at 6-6.
        let ending = if rng.gen_bool(in_tiebreak_prob) {
            let tb = partial_tiebreak_points(rng);
            SetScore::with_tiebreak(6, 6, tb.p1, tb.p2)
        } else {
            SetScore {
                games: Some(partial_set_games(rng)),
                tiebreak: None,
            }
        };
        let winner = ending
            .tiebreak
            .unwrap_or_else(|| ending.games.expect("ending set has games"))
            .leader_slot();

        let score = match ending_set {
            1 => ScoreCard {
                set1: ending,
                ..ScoreCard::blank()
            },
            2 => ScoreCard {
                set1,
                set2: ending,
                ..ScoreCard::blank()
            },
            _ => ScoreCard {
                set1,
                set2,
                set3: ending,
                super_tiebreak: None,
            },
        };
        Ok(GeneratedScore { score, winner })
    }
}

/// Uniform partial set score: unequal games, both at most 6, excluding every
/// completed score. 0-0 never occurs since the sides must differ.
fn partial_set_games<R: Rng + ?Sized>(rng: &mut R) -> ScorePair {
    let candidates: Vec<ScorePair> = (0..=6u8)
        .flat_map(|g1| (0..=6u8).map(move |g2| ScorePair::new(g1, g2)))
        .filter(|p| p.p1 != p.p2 && !is_valid_set_score(*p))
        .collect();
    *candidates.choose(rng).expect("non-empty candidate set")
}

/// Uniform partial tie-break points: unequal, not yet a completed tie-break.
fn partial_tiebreak_points<R: Rng + ?Sized>(rng: &mut R) -> ScorePair {
    let candidates: Vec<ScorePair> = (0..=12u8)
        .flat_map(|p1| (0..=12u8).map(move |p2| ScorePair::new(p1, p2)))
        .filter(|p| p.p1 != p.p2 && !is_valid_tiebreak(*p))
        .collect();
    *candidates.choose(rng).expect("non-empty candidate set")
}

/// Uniform partial super tie-break points.
fn partial_super_tiebreak_points<R: Rng + ?Sized>(rng: &mut R) -> ScorePair {
    let candidates: Vec<ScorePair> = (0..=18u8)
        .flat_map(|p1| (0..=18u8).map(move |p2| ScorePair::new(p1, p2)))
        .filter(|p| p.p1 != p.p2 && !is_valid_super_tiebreak(*p))
        .collect();
    *candidates.choose(rng).expect("non-empty candidate set")
}
