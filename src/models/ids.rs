//! Identifier aliases for the persisted entities.
//!
//! The persistence collaborator keys everything by small integer ids, so the
//! engine does the same rather than inventing its own id scheme.

/// Player identifier.
pub type PlayerId = i64;

/// Tournament identifier.
pub type TournamentId = i64;

/// Draw identifier (one bracket per tournament/age-category/gender).
pub type DrawId = i64;

/// Match identifier.
pub type MatchId = i64;

/// Age category identifier (e.g. +60, +65).
pub type AgeCategoryId = i64;

/// Gender identifier.
pub type GenderId = i64;

/// Stage-coded round identifier (1 = R64 .. 6 = Final).
pub type RoundId = u32;
