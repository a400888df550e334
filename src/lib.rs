//! # Matchpoint
//!
//! A knockout tennis tournament engine: seeded draws, score validation and
//! generation, match advancement and a 52-week rolling ranking.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (entries, draws, matches, points, etc.)
//! - **rules**: Immutable policy carrying probabilities, tables and timings
//! - **calendar**: ISO-week deadlines and the ranking window
//! - **entry / eligibility / seeding / draw**: Entry list to placed bracket
//! - **score / bracket / schedule**: Results, advancement and match dates
//! - **ranking**: Points history and the weekly ranking table
//! - **simulate**: Full-draw simulation through the real result path
//! - **storage**: JSONL persistence

pub mod bracket;
pub mod calendar;
pub mod draw;
pub mod eligibility;
pub mod entry;
pub mod error;
pub mod models;
pub mod ranking;
pub mod rules;
pub mod schedule;
pub mod score;
pub mod seeding;
pub mod simulate;
pub mod storage;

pub use models::*;

use calendar::IsoWeek;

/// Parse an ISO week string (e.g., "2026-W07", "2026-w7", "2026-07").
pub fn parse_iso_week(s: &str) -> Option<IsoWeek> {
    let s = s.trim();
    let (year_str, week_str) = s.split_once('-')?;
    let year: i32 = year_str.parse().ok()?;
    let week_str = week_str
        .strip_prefix('W')
        .or_else(|| week_str.strip_prefix('w'))
        .unwrap_or(week_str);
    let week: u32 = week_str.parse().ok()?;
    if !(1..=53).contains(&week) {
        return None;
    }
    Some(IsoWeek::new(year, week))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_week_with_w() {
        assert_eq!(parse_iso_week("2026-W07"), Some(IsoWeek::new(2026, 7)));
    }

    #[test]
    fn test_parse_iso_week_lowercase() {
        assert_eq!(parse_iso_week("2026-w7"), Some(IsoWeek::new(2026, 7)));
    }

    #[test]
    fn test_parse_iso_week_plain() {
        assert_eq!(parse_iso_week("2025-52"), Some(IsoWeek::new(2025, 52)));
    }

    #[test]
    fn test_parse_iso_week_out_of_range() {
        assert_eq!(parse_iso_week("2026-W54"), None);
        assert_eq!(parse_iso_week("2026-W0"), None);
    }

    #[test]
    fn test_parse_iso_week_invalid() {
        assert_eq!(parse_iso_week("garbage"), None);
        assert_eq!(parse_iso_week(""), None);
    }
}
