//! Weighted score tables.
//!
//! All random score selection goes through these tables so that the
//! distributions live in one place (the rules policy) and stay deterministic
//! under an injected random source.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::ScorePair;

/// One weighted scoreline, e.g. `score = "6-3"`, `weight = 0.30`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedScore {
    pub score: String,
    pub weight: f64,
}

/// A discrete distribution over scorelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable {
    entries: Vec<WeightedScore>,
}

impl WeightedTable {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(score, weight)| WeightedScore {
                    score: (*score).to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    /// Check the table is usable: non-empty, parseable scores, non-negative
    /// weights with a positive sum.
    pub fn validate(&self, name: &str) -> EngineResult<()> {
        if self.entries.is_empty() {
            return Err(EngineError::Configuration(format!(
                "{name}: empty weight table"
            )));
        }
        let mut total = 0.0;
        for entry in &self.entries {
            parse_score(&entry.score)
                .ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "{name}: unparseable score {:?}",
                        entry.score
                    ))
                })?;
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(EngineError::Configuration(format!(
                    "{name}: invalid weight {} for {:?}",
                    entry.weight, entry.score
                )));
            }
            total += entry.weight;
        }
        if total <= 0.0 {
            return Err(EngineError::Configuration(format!(
                "{name}: sum of weights must be > 0, got {total}"
            )));
        }
        Ok(())
    }

    /// Draw one scoreline according to the weights.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<ScorePair> {
        let weights: Vec<f64> = self.entries.iter().map(|e| e.weight).collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| EngineError::Configuration(format!("weight table unusable: {e}")))?;
        let chosen = &self.entries[dist.sample(rng)];
        parse_score(&chosen.score).ok_or_else(|| {
            EngineError::Configuration(format!("unparseable score {:?}", chosen.score))
        })
    }
}

/// Parse `"7-5"` into a score pair.
fn parse_score(s: &str) -> Option<ScorePair> {
    let (a, b) = s.split_once('-')?;
    Some(ScorePair::new(
        a.trim().parse().ok()?,
        b.trim().parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("7-5"), Some(ScorePair::new(7, 5)));
        assert_eq!(parse_score("10-8"), Some(ScorePair::new(10, 8)));
        assert_eq!(parse_score("banana"), None);
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let table = WeightedTable::new(&[("6-3", -0.1), ("6-4", 0.5)]);
        assert!(table.validate("test").is_err());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let table = WeightedTable::new(&[]);
        assert!(table.validate("test").is_err());
    }

    #[test]
    fn test_sample_is_deterministic_under_seed() {
        let table = WeightedTable::new(&[("6-3", 0.5), ("6-4", 0.3), ("7-5", 0.2)]);
        let mut a = ChaCha8Rng::seed_from_u64(11);
        let mut b = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20 {
            assert_eq!(table.sample(&mut a).unwrap(), table.sample(&mut b).unwrap());
        }
    }

    #[test]
    fn test_sample_respects_certainty() {
        let table = WeightedTable::new(&[("6-0", 1.0), ("6-1", 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..10 {
            assert_eq!(table.sample(&mut rng).unwrap(), ScorePair::new(6, 0));
        }
    }
}
