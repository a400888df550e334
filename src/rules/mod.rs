//! Tournament rules policy.
//!
//! Single source of truth for probabilities, score distributions, seed
//! buckets, suspension durations and timing constants. The policy is an
//! immutable value handed to each engine at construction; nothing in the
//! crate reads ambient global rule state. Every field has a default carrying
//! the production rulebook values, and the whole policy can be overridden
//! from a TOML file.

mod weights;

pub use weights::{WeightedScore, WeightedTable};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::eligibility::AgeCategoryRule;
use crate::error::{EngineError, EngineResult};
use crate::models::{AgeCategoryId, GenderId, StageResult, TournamentCategory};

/// Timing constants, all UTC. Weekdays are 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRules {
    #[serde(default = "default_entry_deadline_weekday")]
    pub entry_deadline_weekday: u8,
    #[serde(default = "default_entry_deadline_hour")]
    pub entry_deadline_hour: u8,
    #[serde(default = "default_draw_publication_weekday")]
    pub draw_publication_weekday: u8,
    #[serde(default = "default_draw_publication_hour")]
    pub draw_publication_hour: u8,
    #[serde(default = "default_ranking_publication_hour")]
    pub ranking_publication_hour: u8,
}

fn default_entry_deadline_weekday() -> u8 {
    1 // Tuesday
}
fn default_entry_deadline_hour() -> u8 {
    10
}
fn default_draw_publication_weekday() -> u8 {
    4 // Friday
}
fn default_draw_publication_hour() -> u8 {
    19
}
fn default_ranking_publication_hour() -> u8 {
    20
}

impl Default for TimingRules {
    fn default() -> Self {
        Self {
            entry_deadline_weekday: default_entry_deadline_weekday(),
            entry_deadline_hour: default_entry_deadline_hour(),
            draw_publication_weekday: default_draw_publication_weekday(),
            draw_publication_hour: default_draw_publication_hour(),
            ranking_publication_hour: default_ranking_publication_hour(),
        }
    }
}

/// Match outcome probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchProbabilities {
    /// The better ranked player wins this share of played matches.
    #[serde(default = "default_better_ranked_win")]
    pub better_ranked_win: f64,
    /// Share of completed sets decided 7-6.
    #[serde(default = "default_set_tiebreak")]
    pub set_tiebreak: f64,
    /// Share of tie-breaks that go past 7-5 into deuce territory.
    #[serde(default = "default_tiebreak_deuce")]
    pub tiebreak_deuce: f64,
    /// Share of super tie-breaks that go past 10-8.
    #[serde(default = "default_tiebreak_deuce")]
    pub super_tiebreak_deuce: f64,
    /// Per-played-match retirement rate.
    #[serde(default = "default_retirement_rate")]
    pub retirement: f64,
    /// Per-played-match disqualification rate.
    #[serde(default = "default_disqualification_rate")]
    pub disqualification: f64,
    /// Per-draw chance of a withdrawal between deadline and draw.
    #[serde(default = "default_pre_draw_withdrawal")]
    pub pre_draw_withdrawal: f64,
    /// Per-player chance of a no-show after the draw is published.
    #[serde(default = "default_post_draw_no_show")]
    pub post_draw_no_show: f64,
    /// Chance a retirement happens during a tie-break at 6-6.
    #[serde(default = "default_retire_in_tiebreak")]
    pub retire_in_tiebreak: f64,
    /// Chance a disqualification happens during a tie-break at 6-6.
    #[serde(default = "default_dq_in_tiebreak")]
    pub dq_in_tiebreak: f64,
}

fn default_better_ranked_win() -> f64 {
    2.0 / 3.0
}
fn default_set_tiebreak() -> f64 {
    0.10
}
fn default_tiebreak_deuce() -> f64 {
    0.20
}
fn default_retirement_rate() -> f64 {
    0.03
}
fn default_disqualification_rate() -> f64 {
    0.002
}
fn default_pre_draw_withdrawal() -> f64 {
    0.001
}
fn default_post_draw_no_show() -> f64 {
    0.005
}
fn default_retire_in_tiebreak() -> f64 {
    0.25
}
fn default_dq_in_tiebreak() -> f64 {
    0.20
}

impl Default for MatchProbabilities {
    fn default() -> Self {
        Self {
            better_ranked_win: default_better_ranked_win(),
            set_tiebreak: default_set_tiebreak(),
            tiebreak_deuce: default_tiebreak_deuce(),
            super_tiebreak_deuce: default_tiebreak_deuce(),
            retirement: default_retirement_rate(),
            disqualification: default_disqualification_rate(),
            pre_draw_withdrawal: default_pre_draw_withdrawal(),
            post_draw_no_show: default_post_draw_no_show(),
            retire_in_tiebreak: default_retire_in_tiebreak(),
            dq_in_tiebreak: default_dq_in_tiebreak(),
        }
    }
}

/// Score distributions for completed sets, tie-breaks and super tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTables {
    #[serde(default = "default_normal_set")]
    pub normal_set: WeightedTable,
    #[serde(default = "default_tiebreak_normal")]
    pub tiebreak_normal: WeightedTable,
    #[serde(default = "default_tiebreak_deuce_scores")]
    pub tiebreak_deuce: WeightedTable,
    #[serde(default = "default_super_tiebreak_normal")]
    pub super_tiebreak_normal: WeightedTable,
    #[serde(default = "default_super_tiebreak_deuce_scores")]
    pub super_tiebreak_deuce: WeightedTable,
}

fn default_normal_set() -> WeightedTable {
    WeightedTable::new(&[
        ("6-3", 0.30),
        ("6-4", 0.25),
        ("7-5", 0.20),
        ("6-2", 0.10),
        ("6-1", 0.10),
        ("6-0", 0.09),
    ])
}

fn default_tiebreak_normal() -> WeightedTable {
    WeightedTable::new(&[
        ("7-4", 0.30),
        ("7-3", 0.25),
        ("7-5", 0.20),
        ("7-2", 0.15),
        ("7-1", 0.10),
        ("7-0", 0.10),
    ])
}

fn default_tiebreak_deuce_scores() -> WeightedTable {
    WeightedTable::new(&[
        ("8-6", 0.25),
        ("9-7", 0.20),
        ("10-8", 0.15),
        ("11-9", 0.10),
        ("12-10", 0.10),
        ("13-11", 0.10),
        ("14-12", 0.05),
        ("15-13", 0.05),
    ])
}

fn default_super_tiebreak_normal() -> WeightedTable {
    WeightedTable::new(&[
        ("10-7", 0.25),
        ("10-6", 0.20),
        ("10-8", 0.15),
        ("10-5", 0.10),
        ("10-4", 0.10),
        ("10-3", 0.10),
        ("10-2", 0.06),
        ("10-1", 0.03),
        ("10-0", 0.01),
    ])
}

fn default_super_tiebreak_deuce_scores() -> WeightedTable {
    WeightedTable::new(&[
        ("11-9", 0.25),
        ("12-10", 0.20),
        ("13-11", 0.15),
        ("14-12", 0.10),
        ("15-13", 0.10),
        ("16-14", 0.10),
        ("17-15", 0.05),
        ("18-16", 0.05),
    ])
}

impl Default for ScoreTables {
    fn default() -> Self {
        Self {
            normal_set: default_normal_set(),
            tiebreak_normal: default_tiebreak_normal(),
            tiebreak_deuce: default_tiebreak_deuce_scores(),
            super_tiebreak_normal: default_super_tiebreak_normal(),
            super_tiebreak_deuce: default_super_tiebreak_deuce_scores(),
        }
    }
}

/// Seed count per draw-size bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBucket {
    pub max_players: u32,
    pub num_seeds: u32,
}

/// Draw size limits and seed buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedingRules {
    #[serde(default = "default_min_draw_size")]
    pub min_draw_size: u32,
    #[serde(default = "default_max_draw_size")]
    pub max_draw_size: u32,
    #[serde(default = "default_seed_buckets")]
    pub buckets: Vec<SeedBucket>,
}

fn default_min_draw_size() -> u32 {
    6
}
fn default_max_draw_size() -> u32 {
    64
}
fn default_seed_buckets() -> Vec<SeedBucket> {
    vec![
        SeedBucket {
            max_players: 8,
            num_seeds: 2,
        },
        SeedBucket {
            max_players: 16,
            num_seeds: 4,
        },
        SeedBucket {
            max_players: 32,
            num_seeds: 8,
        },
        SeedBucket {
            max_players: 64,
            num_seeds: 16,
        },
    ]
}

impl Default for SeedingRules {
    fn default() -> Self {
        Self {
            min_draw_size: default_min_draw_size(),
            max_draw_size: default_max_draw_size(),
            buckets: default_seed_buckets(),
        }
    }
}

impl SeedingRules {
    /// Number of seeds for a draw size: 6-8 players get 2 seeds, 9-16 get 4,
    /// 17-32 get 8, larger draws get 16. Draws below the minimum are
    /// cancelled and never seeded.
    pub fn seeds_for_draw_size(&self, draw_size: u32) -> EngineResult<u32> {
        if draw_size < self.min_draw_size {
            return Err(EngineError::Configuration(format!(
                "draw_size={draw_size} below minimum {} (draw cancelled)",
                self.min_draw_size
            )));
        }
        let mut buckets: Vec<&SeedBucket> = self.buckets.iter().collect();
        buckets.sort_by_key(|b| b.max_players);
        for bucket in &buckets {
            if draw_size <= bucket.max_players {
                return Ok(bucket.num_seeds);
            }
        }
        buckets
            .last()
            .map(|b| b.num_seeds)
            .ok_or_else(|| EngineError::Configuration("no seed buckets configured".to_string()))
    }
}

/// Suspension durations in months, anchored at the sanctioned match date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisciplineRules {
    #[serde(default = "default_walkover_months")]
    pub walkover_suspension_months: u32,
    #[serde(default = "default_disqualification_months")]
    pub disqualification_suspension_months: u32,
}

fn default_walkover_months() -> u32 {
    2
}
fn default_disqualification_months() -> u32 {
    6
}

impl Default for DisciplineRules {
    fn default() -> Self {
        Self {
            walkover_suspension_months: default_walkover_months(),
            disqualification_suspension_months: default_disqualification_months(),
        }
    }
}

/// Rolling ranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRules {
    #[serde(default = "default_rolling_weeks")]
    pub rolling_weeks: u32,
    #[serde(default = "default_best_results")]
    pub best_results_counted: usize,
}

fn default_rolling_weeks() -> u32 {
    52
}
fn default_best_results() -> usize {
    4
}

impl Default for RankingRules {
    fn default() -> Self {
        Self {
            rolling_weeks: default_rolling_weeks(),
            best_results_counted: default_best_results(),
        }
    }
}

/// Deterministic third-set format per (age category, gender).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThirdSetFormat {
    pub age_category_id: AgeCategoryId,
    pub gender_id: GenderId,
    pub has_super_tiebreak: bool,
}

fn default_third_set_formats() -> Vec<ThirdSetFormat> {
    // Men +60 plays a normal third set; every other category uses the
    // super tie-break.
    vec![
        ThirdSetFormat {
            age_category_id: 1,
            gender_id: 1,
            has_super_tiebreak: false,
        },
        ThirdSetFormat {
            age_category_id: 2,
            gender_id: 1,
            has_super_tiebreak: true,
        },
        ThirdSetFormat {
            age_category_id: 1,
            gender_id: 2,
            has_super_tiebreak: true,
        },
        ThirdSetFormat {
            age_category_id: 2,
            gender_id: 2,
            has_super_tiebreak: true,
        },
    ]
}

fn default_age_categories() -> Vec<AgeCategoryRule> {
    vec![
        AgeCategoryRule {
            age_category_id: 1,
            min_age: 60,
            max_age: 64,
        },
        AgeCategoryRule {
            age_category_id: 2,
            min_age: 65,
            max_age: 120,
        },
    ]
}

/// Points awarded for reaching a stage in a tournament category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsRule {
    pub category: TournamentCategory,
    pub stage: StageResult,
    pub points: i64,
}

fn default_points_rules() -> Vec<PointsRule> {
    // Each stage earns a fixed share of the category's headline points.
    let bases = [
        (TournamentCategory::MT1000, 1000i64),
        (TournamentCategory::MT700, 700),
        (TournamentCategory::MT400, 400),
        (TournamentCategory::MT200, 200),
        (TournamentCategory::MT100, 100),
    ];
    let shares = [
        (StageResult::Winner, 100i64),
        (StageResult::Finalist, 60),
        (StageResult::Semifinalist, 36),
        (StageResult::Quarterfinalist, 22),
        (StageResult::LastSixteen, 13),
        (StageResult::LastThirtyTwo, 8),
        (StageResult::LastSixtyFour, 5),
    ];
    bases
        .iter()
        .flat_map(|&(category, base)| {
            shares.iter().map(move |&(stage, pct)| PointsRule {
                category,
                stage,
                points: base * pct / 100,
            })
        })
        .collect()
}

/// Immutable rule configuration for every engine in the crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesPolicy {
    #[serde(default)]
    pub timing: TimingRules,
    #[serde(default)]
    pub probabilities: MatchProbabilities,
    #[serde(default)]
    pub scores: ScoreTables,
    #[serde(default)]
    pub seeding: SeedingRules,
    #[serde(default)]
    pub discipline: DisciplineRules,
    #[serde(default)]
    pub ranking: RankingRules,
    #[serde(default = "default_age_categories")]
    pub age_categories: Vec<AgeCategoryRule>,
    #[serde(default = "default_third_set_formats")]
    pub third_set_formats: Vec<ThirdSetFormat>,
    #[serde(default = "default_points_rules")]
    pub points_rules: Vec<PointsRule>,
}

impl Default for RulesPolicy {
    fn default() -> Self {
        Self {
            timing: TimingRules::default(),
            probabilities: MatchProbabilities::default(),
            scores: ScoreTables::default(),
            seeding: SeedingRules::default(),
            discipline: DisciplineRules::default(),
            ranking: RankingRules::default(),
            age_categories: default_age_categories(),
            third_set_formats: default_third_set_formats(),
            points_rules: default_points_rules(),
        }
    }
}

impl RulesPolicy {
    /// Load a policy from a TOML file; missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Configuration(format!(
                "failed to read rules file {:?}: {e}",
                path.as_ref()
            ))
        })?;
        let policy: RulesPolicy = toml::from_str(&text)
            .map_err(|e| EngineError::Configuration(format!("failed to parse rules file: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Fail fast on a malformed policy before any generation runs.
    pub fn validate(&self) -> EngineResult<()> {
        self.scores.normal_set.validate("normal_set")?;
        self.scores.tiebreak_normal.validate("tiebreak_normal")?;
        self.scores.tiebreak_deuce.validate("tiebreak_deuce")?;
        self.scores
            .super_tiebreak_normal
            .validate("super_tiebreak_normal")?;
        self.scores
            .super_tiebreak_deuce
            .validate("super_tiebreak_deuce")?;

        let probs = [
            ("better_ranked_win", self.probabilities.better_ranked_win),
            ("set_tiebreak", self.probabilities.set_tiebreak),
            ("tiebreak_deuce", self.probabilities.tiebreak_deuce),
            (
                "super_tiebreak_deuce",
                self.probabilities.super_tiebreak_deuce,
            ),
            ("retirement", self.probabilities.retirement),
            ("disqualification", self.probabilities.disqualification),
            (
                "pre_draw_withdrawal",
                self.probabilities.pre_draw_withdrawal,
            ),
            ("post_draw_no_show", self.probabilities.post_draw_no_show),
            ("retire_in_tiebreak", self.probabilities.retire_in_tiebreak),
            ("dq_in_tiebreak", self.probabilities.dq_in_tiebreak),
        ];
        for (name, p) in probs {
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::Configuration(format!(
                    "probability {name} must be in [0,1], got {p}"
                )));
            }
        }

        if self.seeding.buckets.is_empty() {
            return Err(EngineError::Configuration(
                "no seed buckets configured".to_string(),
            ));
        }
        if self.seeding.min_draw_size < 2 {
            return Err(EngineError::Configuration(
                "min_draw_size must be at least 2".to_string(),
            ));
        }
        if self.ranking.best_results_counted == 0 {
            return Err(EngineError::Configuration(
                "best_results_counted must be positive".to_string(),
            ));
        }
        if self.age_categories.is_empty() {
            return Err(EngineError::Configuration(
                "no age categories configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Points for a (tournament category, stage result) pair, 0 when the
    /// table has no entry.
    pub fn points_for(&self, category: TournamentCategory, stage: StageResult) -> i64 {
        self.points_rules
            .iter()
            .find(|r| r.category == category && r.stage == stage)
            .map(|r| r.points)
            .unwrap_or(0)
    }

    /// Third-set format for a draw, deterministic per category mapping.
    pub fn has_super_tiebreak(
        &self,
        age_category_id: AgeCategoryId,
        gender_id: GenderId,
    ) -> EngineResult<bool> {
        self.third_set_formats
            .iter()
            .find(|f| f.age_category_id == age_category_id && f.gender_id == gender_id)
            .map(|f| f.has_super_tiebreak)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "no third-set format rule for age_category_id={age_category_id}, \
                     gender_id={gender_id}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_validates() {
        RulesPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_seeds_for_draw_size_buckets() {
        let rules = SeedingRules::default();
        assert_eq!(rules.seeds_for_draw_size(6).unwrap(), 2);
        assert_eq!(rules.seeds_for_draw_size(8).unwrap(), 2);
        assert_eq!(rules.seeds_for_draw_size(9).unwrap(), 4);
        assert_eq!(rules.seeds_for_draw_size(16).unwrap(), 4);
        assert_eq!(rules.seeds_for_draw_size(32).unwrap(), 8);
        assert_eq!(rules.seeds_for_draw_size(64).unwrap(), 16);
        assert_eq!(rules.seeds_for_draw_size(65).unwrap(), 16);
    }

    #[test]
    fn test_seeds_for_draw_size_rejects_tiny_draws() {
        let rules = SeedingRules::default();
        assert!(rules.seeds_for_draw_size(5).is_err());
    }

    #[test]
    fn test_has_super_tiebreak_mapping() {
        let policy = RulesPolicy::default();
        assert!(!policy.has_super_tiebreak(1, 1).unwrap());
        assert!(policy.has_super_tiebreak(2, 1).unwrap());
        assert!(policy.has_super_tiebreak(1, 2).unwrap());
        assert!(policy.has_super_tiebreak(9, 9).is_err());
    }

    #[test]
    fn test_points_for_lookup() {
        let policy = RulesPolicy::default();
        assert_eq!(
            policy.points_for(TournamentCategory::MT1000, StageResult::Winner),
            1000
        );
        assert_eq!(
            policy.points_for(TournamentCategory::MT100, StageResult::Finalist),
            60
        );
        // Unknown combinations default to zero points.
        let empty = RulesPolicy {
            points_rules: Vec::new(),
            ..RulesPolicy::default()
        };
        assert_eq!(
            empty.points_for(TournamentCategory::MT1000, StageResult::Winner),
            0
        );
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut policy = RulesPolicy::default();
        policy.probabilities.set_tiebreak = 1.5;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_policy_roundtrips_through_toml() {
        let policy = RulesPolicy::default();
        let text = toml::to_string(&policy).unwrap();
        let back: RulesPolicy = toml::from_str(&text).unwrap();
        back.validate().unwrap();
        assert_eq!(
            back.discipline.disqualification_suspension_months,
            policy.discipline.disqualification_suspension_months
        );
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let policy: RulesPolicy = toml::from_str("").unwrap();
        policy.validate().unwrap();
        assert_eq!(policy.ranking.rolling_weeks, 52);
        assert_eq!(policy.discipline.walkover_suspension_months, 2);
    }
}
