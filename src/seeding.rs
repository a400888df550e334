//! Seeding engine.
//!
//! Produces seed snapshots for a draw: the planned seeding computed at the
//! entry deadline, and — only when a seeded player withdraws before the draw
//! — a recomputed actual seeding. Downstream consumers pick the snapshot via
//! [`select_snapshot`].

use std::collections::HashMap;

use tracing::debug;

use crate::error::EngineResult;
use crate::models::{DrawId, PlayerId, SeedAssignment};
use crate::rules::SeedingRules;

/// Sort players best-first: lower ranking position wins, player id breaks
/// ties deterministically.
fn ranked_players(rankings: &HashMap<PlayerId, u32>) -> Vec<PlayerId> {
    let mut players: Vec<(PlayerId, u32)> = rankings.iter().map(|(&p, &r)| (p, r)).collect();
    players.sort_by_key(|&(player_id, rank)| (rank, player_id));
    players.into_iter().map(|(player_id, _)| player_id).collect()
}

/// Planned seeding at the entry deadline: top-K by ranking position, seed
/// numbers 1..K in rank order, `is_actual_seeding = false`.
pub fn compute_planned_seeding(
    draw_id: DrawId,
    rankings: &HashMap<PlayerId, u32>,
    draw_size: u32,
    rules: &SeedingRules,
) -> EngineResult<Vec<SeedAssignment>> {
    let seed_count = rules.seeds_for_draw_size(draw_size)? as usize;
    let seeds = ranked_players(rankings)
        .into_iter()
        .take(seed_count)
        .enumerate()
        .map(|(i, player_id)| SeedAssignment {
            draw_id,
            player_id,
            seed_number: (i + 1) as u32,
            is_actual_seeding: false,
        })
        .collect();
    Ok(seeds)
}

/// Adjusted seeding after a pre-draw withdrawal.
///
/// Returns `None` when the withdrawn player was not among the planned seeds:
/// an unseeded withdrawal never produces an actual snapshot. Otherwise the
/// top-K is recomputed over the remaining pool with
/// `is_actual_seeding = true`.
pub fn compute_actual_seeding_after_withdrawal(
    draw_id: DrawId,
    planned: &[SeedAssignment],
    withdrawn_player_id: PlayerId,
    rankings: &HashMap<PlayerId, u32>,
    draw_size: u32,
    rules: &SeedingRules,
) -> EngineResult<Option<Vec<SeedAssignment>>> {
    if !planned.iter().any(|s| s.player_id == withdrawn_player_id) {
        return Ok(None);
    }

    debug!(draw_id, withdrawn_player_id, "seeded withdrawal, recomputing seeds");

    let seed_count = rules.seeds_for_draw_size(draw_size)? as usize;
    let remaining: HashMap<PlayerId, u32> = rankings
        .iter()
        .filter(|(&player_id, _)| player_id != withdrawn_player_id)
        .map(|(&p, &r)| (p, r))
        .collect();

    let seeds = ranked_players(&remaining)
        .into_iter()
        .take(seed_count)
        .enumerate()
        .map(|(i, player_id)| SeedAssignment {
            draw_id,
            player_id,
            seed_number: (i + 1) as u32,
            is_actual_seeding: true,
        })
        .collect();
    Ok(Some(seeds))
}

/// Pick the authoritative snapshot for placement: actual rows if any exist,
/// planned otherwise, sorted by seed number. `None` when no rows exist at
/// all (placement then falls back to entry-point ordering).
pub fn select_snapshot(assignments: &[SeedAssignment]) -> Option<Vec<SeedAssignment>> {
    if assignments.is_empty() {
        return None;
    }
    let actual: Vec<SeedAssignment> = assignments
        .iter()
        .filter(|s| s.is_actual_seeding)
        .cloned()
        .collect();
    let mut chosen = if actual.is_empty() {
        assignments
            .iter()
            .filter(|s| !s.is_actual_seeding)
            .cloned()
            .collect::<Vec<_>>()
    } else {
        actual
    };
    if chosen.is_empty() {
        return None;
    }
    chosen.sort_by_key(|s| s.seed_number);
    Some(chosen)
}
