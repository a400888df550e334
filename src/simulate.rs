//! Full-draw simulation.
//!
//! Drives a bracket from skeleton to champion through the same
//! [`crate::bracket::apply_result`] path real results take: weighted winner
//! selection, rare retirements and disqualifications, post-draw no-shows as
//! walkovers, and a final scheduling pass. Deterministic under a seeded
//! random source.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::bracket::{apply_result, create_match_skeleton, ResultPayload};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    DrawId, DrawPlayer, Entry, Match, MatchId, MatchStatus, PlayerId, PlayerSuspension, ScoreCard,
    Slot, TournamentId,
};
use crate::rules::RulesPolicy;
use crate::schedule::schedule_match_dates;
use crate::score::{validate, GeneratedScore, ScoreGenerator};

/// Attempt cap when regenerating a scoreline the validator rejects.
const MAX_SCORE_ATTEMPTS: u32 = 50;

/// Everything a simulated draw produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub matches: Vec<Match>,
    pub suspensions: Vec<PlayerSuspension>,
}

/// Bracket simulator bound to one rules policy.
pub struct DrawSimulator<'a> {
    policy: &'a RulesPolicy,
}

impl<'a> DrawSimulator<'a> {
    pub fn new(policy: &'a RulesPolicy) -> Self {
        Self { policy }
    }

    /// Rare pre-draw withdrawal: at the configured per-draw rate, one random
    /// entrant defaults between the entry deadline and the draw. The caller
    /// must re-run seeding and placement without the withdrawn player.
    pub fn pick_pre_draw_withdrawal<R: Rng + ?Sized>(
        &self,
        entries: &[Entry],
        rng: &mut R,
    ) -> Option<PlayerId> {
        if entries.is_empty() || !rng.gen_bool(self.policy.probabilities.pre_draw_withdrawal) {
            return None;
        }
        entries.choose(rng).map(|e| e.player_id)
    }

    /// Per-player post-draw no-shows, each becoming a walkover in the
    /// player's first scheduled match.
    fn pick_no_shows<R: Rng + ?Sized>(
        &self,
        draw_players: &[DrawPlayer],
        rng: &mut R,
    ) -> HashSet<PlayerId> {
        draw_players
            .iter()
            .filter(|_| rng.gen_bool(self.policy.probabilities.post_draw_no_show))
            .map(|p| p.player_id)
            .collect()
    }

    /// The better ranked player wins at the configured rate; unknown or equal
    /// rankings fall back to a fair coin.
    fn pick_winner_slot<R: Rng + ?Sized>(
        &self,
        player1_id: PlayerId,
        player2_id: PlayerId,
        rankings: Option<&HashMap<PlayerId, u32>>,
        rng: &mut R,
    ) -> Slot {
        let coin = |rng: &mut R| {
            if rng.gen_bool(0.5) {
                Slot::Player1
            } else {
                Slot::Player2
            }
        };
        let Some(rankings) = rankings else {
            return coin(rng);
        };
        let (Some(&r1), Some(&r2)) = (rankings.get(&player1_id), rankings.get(&player2_id)) else {
            return coin(rng);
        };
        if r1 == r2 {
            return coin(rng);
        }
        let better = if r1 < r2 { Slot::Player1 } else { Slot::Player2 };
        if rng.gen_bool(self.policy.probabilities.better_ranked_win) {
            better
        } else {
            better.other()
        }
    }

    fn pick_status<R: Rng + ?Sized>(&self, rng: &mut R) -> MatchStatus {
        let r: f64 = rng.gen();
        let p = &self.policy.probabilities;
        if r < p.disqualification {
            MatchStatus::Disqualified
        } else if r < p.disqualification + p.retirement {
            MatchStatus::Retired
        } else {
            MatchStatus::Completed
        }
    }

    /// Generate a scoreline for a status with the required winner, retrying
    /// within the attempt cap until the validator accepts it.
    fn generate_score<R: Rng + ?Sized>(
        &self,
        status: MatchStatus,
        has_super_tiebreak: bool,
        winner: Slot,
        rng: &mut R,
    ) -> EngineResult<ScoreCard> {
        let generator = ScoreGenerator::new(self.policy);
        let mut last_errors = Vec::new();
        for _ in 0..MAX_SCORE_ATTEMPTS {
            let generated: GeneratedScore = match status {
                MatchStatus::Completed => generator.completed(has_super_tiebreak, rng)?,
                MatchStatus::Retired => generator.retired(has_super_tiebreak, rng)?,
                MatchStatus::Disqualified => generator.disqualified(has_super_tiebreak, rng)?,
                _ => {
                    return Ok(ScoreCard::blank());
                }
            }
            .with_winner(winner);

            let report = validate::validate(&generated.score, status);
            if report.is_valid() {
                return Ok(generated.score);
            }
            last_errors = report.errors;
        }
        warn!(?status, ?last_errors, "score generation exhausted attempts");
        Err(EngineError::Configuration(format!(
            "could not generate a valid {status:?} score within {MAX_SCORE_ATTEMPTS} attempts"
        )))
    }

    /// Simulate one draw end to end.
    ///
    /// Creates the skeleton, plays every fillable match in bracket order and
    /// finishes with the scheduling pass. Suspensions produced by walkovers
    /// and disqualifications are returned alongside the finished matches.
    #[allow(clippy::too_many_arguments)]
    pub fn simulate_draw<R: Rng + ?Sized>(
        &self,
        draw_id: DrawId,
        tournament_id: TournamentId,
        draw_players: &[DrawPlayer],
        tournament_start_date: NaiveDate,
        has_super_tiebreak: bool,
        first_match_id: MatchId,
        rankings: Option<&HashMap<PlayerId, u32>>,
        rng: &mut R,
    ) -> EngineResult<SimulationOutcome> {
        let mut matches =
            create_match_skeleton(draw_id, draw_players, tournament_start_date, first_match_id)?;
        let no_shows = self.pick_no_shows(draw_players, rng);
        let mut suspensions: Vec<PlayerSuspension> = Vec::new();

        loop {
            // Next playable match in bracket order.
            let next = matches
                .iter()
                .filter(|m| {
                    m.status == MatchStatus::Scheduled
                        && m.player1_id.is_some()
                        && m.player2_id.is_some()
                })
                .min_by_key(|m| (m.round_id, m.match_number))
                .map(|m| {
                    (
                        m.match_id,
                        m.player1_id.expect("filtered"),
                        m.player2_id.expect("filtered"),
                    )
                });
            let Some((match_id, player1_id, player2_id)) = next else {
                break;
            };

            let mut winner_slot = self.pick_winner_slot(player1_id, player2_id, rankings, rng);
            let p1_no_show = no_shows.contains(&player1_id);
            let p2_no_show = no_shows.contains(&player2_id);

            let (status, score) = if p1_no_show || p2_no_show {
                if p1_no_show && !p2_no_show {
                    winner_slot = Slot::Player2;
                } else if p2_no_show && !p1_no_show {
                    winner_slot = Slot::Player1;
                }
                (MatchStatus::Walkover, ScoreCard::blank())
            } else {
                let status = self.pick_status(rng);
                let score =
                    self.generate_score(status, has_super_tiebreak, winner_slot, rng)?;
                (status, score)
            };

            let winner_id = match winner_slot {
                Slot::Player1 => player1_id,
                Slot::Player2 => player2_id,
            };
            let applied = apply_result(
                &mut matches,
                draw_id,
                tournament_id,
                &ResultPayload {
                    match_id,
                    status,
                    winner_id,
                    score,
                },
                &suspensions,
                &self.policy.discipline,
            )?;
            suspensions.extend(applied.new_suspension);
        }

        schedule_match_dates(&mut matches, tournament_start_date);

        info!(
            draw_id,
            players = draw_players.len(),
            suspensions = suspensions.len(),
            "draw simulated"
        );
        Ok(SimulationOutcome {
            matches,
            suspensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::validate_player_schedule;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 13).unwrap()
    }

    fn players(n: u32) -> Vec<DrawPlayer> {
        (1..=n as i64)
            .map(|i| DrawPlayer {
                draw_id: 1,
                player_id: i,
                draw_position: i as u32,
                has_bye: false,
                entry_points: 0,
                entry_timestamp: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_simulation_crowns_a_champion() {
        let policy = RulesPolicy::default();
        let simulator = DrawSimulator::new(&policy);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = simulator
            .simulate_draw(1, 9, &players(8), start(), true, 1, None, &mut rng)
            .unwrap();

        assert_eq!(outcome.matches.len(), 7);
        let final_match = outcome.matches.iter().find(|m| m.round_id == 6).unwrap();
        assert!(final_match.status.is_terminal());
        assert!(final_match.winner_id.is_some());
    }

    #[test]
    fn test_every_simulated_score_validates() {
        let policy = RulesPolicy::default();
        let simulator = DrawSimulator::new(&policy);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = simulator
                .simulate_draw(1, 9, &players(16), start(), seed % 2 == 0, 1, None, &mut rng)
                .unwrap();
            for m in &outcome.matches {
                assert!(
                    validate::validate(&m.score, m.status).is_valid(),
                    "seed {seed}: invalid {:?} score {:?}",
                    m.status,
                    m.score
                );
            }
            assert!(validate_player_schedule(&outcome.matches).is_valid());
        }
    }

    #[test]
    fn test_simulation_is_deterministic_per_seed() {
        let policy = RulesPolicy::default();
        let simulator = DrawSimulator::new(&policy);
        let run = || {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            simulator
                .simulate_draw(1, 9, &players(8), start(), true, 1, None, &mut rng)
                .unwrap()
        };
        let a = run();
        let b = run();
        for (x, y) in a.matches.iter().zip(&b.matches) {
            assert_eq!(x.winner_id, y.winner_id);
            assert_eq!(x.status, y.status);
            assert_eq!(x.score, y.score);
        }
    }

    #[test]
    fn test_better_ranked_player_wins_about_two_thirds() {
        let policy = RulesPolicy::default();
        let simulator = DrawSimulator::new(&policy);
        let rankings: HashMap<PlayerId, u32> = [(1, 1), (2, 50)].into();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut wins = 0;
        let trials = 3000;
        for _ in 0..trials {
            if simulator.pick_winner_slot(1, 2, Some(&rankings), &mut rng) == Slot::Player1 {
                wins += 1;
            }
        }
        let share = f64::from(wins) / f64::from(trials);
        assert!((share - 2.0 / 3.0).abs() < 0.03, "share was {share}");
    }

    #[test]
    fn test_no_show_becomes_walkover_with_suspension() {
        let mut policy = RulesPolicy::default();
        // Force everyone to no-show so a walkover is guaranteed.
        policy.probabilities.post_draw_no_show = 1.0;
        let simulator = DrawSimulator::new(&policy);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = simulator
            .simulate_draw(1, 9, &players(8), start(), true, 1, None, &mut rng)
            .unwrap();

        assert!(outcome
            .matches
            .iter()
            .all(|m| m.status == MatchStatus::Walkover));
        assert!(outcome.matches.iter().all(|m| m.score.is_blank()));
        assert!(!outcome.suspensions.is_empty());
        // One suspension per sanctioned player per tournament at most.
        let mut keys: Vec<_> = outcome.suspensions.iter().map(|s| s.natural_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), outcome.suspensions.len());
    }

    #[test]
    fn test_pre_draw_withdrawal_respects_probability() {
        let mut policy = RulesPolicy::default();
        policy.probabilities.pre_draw_withdrawal = 1.0;
        let simulator = DrawSimulator::new(&policy);
        let entries: Vec<Entry> = (1..=6)
            .map(|i| Entry {
                tournament_id: 9,
                player_id: i,
                age_category_id: 1,
                gender_id: 1,
                entry_points: 0,
                entry_timestamp: Utc::now(),
            })
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let withdrawn = simulator.pick_pre_draw_withdrawal(&entries, &mut rng);
        assert!(withdrawn.is_some());

        policy.probabilities.pre_draw_withdrawal = 0.0;
        let simulator = DrawSimulator::new(&policy);
        assert!(simulator
            .pick_pre_draw_withdrawal(&entries, &mut rng)
            .is_none());
    }
}
