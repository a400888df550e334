//! Draw builder.
//!
//! Places every entrant into the bracket positions of a power-of-two-sized
//! draw: seeds at their canonical protected positions, byes to seeds first,
//! everyone else shuffled into the remaining slots. A bye is an unoccupied
//! position; `has_bye` on a player means their first-round opponent slot
//! stays empty.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{DrawId, DrawPlayer, Entry, PlayerId, SeedAssignment};
use crate::seeding::select_snapshot;

/// Canonical seed placement positions (1-based) for a single-elimination
/// draw.
///
/// Seed 1 goes to position 1 and seed 2 to the last position for every draw
/// size; seeds 3/4 sit at the quarter marks and seeds 5-8 at the eighth
/// marks. Seed counts outside {2, 4, 8} fall back to an evenly spaced layout
/// anchored at the top and bottom of the bracket.
pub fn standard_seeding_positions(draw_size: u32, num_seeds: u32) -> Vec<u32> {
    if num_seeds == 0 {
        return Vec::new();
    }

    let d = draw_size;
    let canonical: Option<Vec<u32>> = match num_seeds {
        2 => Some(vec![1, d]),
        4 => Some(vec![1, d, 1 + d / 4, d - d / 4]),
        8 => Some(vec![
            1,
            d,
            1 + d / 4,
            d - d / 4,
            1 + d / 8,
            d - d / 8,
            1 + (3 * d) / 8,
            d - (3 * d) / 8,
        ]),
        _ => None,
    };
    if let Some(positions) = canonical {
        return positions;
    }

    // Fallback: 1 at the top, 2 at the bottom, the rest spread by even steps.
    let mut positions = vec![1, d];
    let step = (d / num_seeds.max(1)).max(1);
    let mut pos = 1 + step;
    while positions.len() < num_seeds as usize && pos < d {
        positions.push(pos);
        pos += step;
    }
    positions.truncate(num_seeds as usize);
    positions
}

/// 0-based index of the first-round bracket pair containing a position.
fn pair_index(position: u32) -> usize {
    ((position - 1) / 2) as usize
}

/// The opposite slot of a first-round pair.
fn opponent_position(position: u32) -> u32 {
    if position % 2 == 1 {
        position + 1
    } else {
        position - 1
    }
}

/// Generate the [`DrawPlayer`] rows for one draw.
///
/// `seed_assignments` may carry planned and/or actual snapshot rows; the
/// actual snapshot wins when present. When no snapshot exists at all, the
/// top `num_seeds` entrants by (entry_points desc, player_id asc) are seeded.
///
/// Fails with a configuration error when the draw is smaller than the
/// entrant list, and with a validation error when a seed snapshot references
/// a player missing from the entries.
#[allow(clippy::too_many_arguments)]
pub fn generate_draw_players<R: Rng + ?Sized>(
    draw_id: DrawId,
    entries: &[Entry],
    draw_size: u32,
    num_seeds: u32,
    withdrawn_player_id: Option<PlayerId>,
    seed_assignments: &[SeedAssignment],
    rng: &mut R,
) -> EngineResult<Vec<DrawPlayer>> {
    // Pre-draw withdrawal: the withdrawn player must never be placed.
    // Seeding adjustment is handled upstream in the seeding engine.
    let entries: Vec<&Entry> = entries
        .iter()
        .filter(|e| Some(e.player_id) != withdrawn_player_id)
        .collect();

    let num_entries = entries.len() as u32;
    if num_entries == 0 {
        return Ok(Vec::new());
    }
    if draw_size < num_entries {
        return Err(EngineError::Configuration(format!(
            "draw_size={draw_size} is smaller than num_entries={num_entries} for draw_id={draw_id}"
        )));
    }
    let num_byes = draw_size - num_entries;

    let mut sorted_entries = entries;
    sorted_entries.sort_by_key(|e| (-e.entry_points, e.player_id));

    let chosen_seeds = select_snapshot(seed_assignments);
    if let Some(chosen) = &chosen_seeds {
        for seed in chosen {
            if !sorted_entries.iter().any(|e| e.player_id == seed.player_id) {
                return Err(EngineError::validation(format!(
                    "seed assignment references player_id={} not present in entries for \
                     draw_id={draw_id}",
                    seed.player_id
                )));
            }
        }
    }

    // Seeded player ids in seed-number order.
    let seeded_player_ids: Vec<PlayerId> = match &chosen_seeds {
        Some(chosen) => chosen
            .iter()
            .take(num_seeds as usize)
            .map(|s| s.player_id)
            .collect(),
        None => sorted_entries
            .iter()
            .take(num_seeds as usize)
            .map(|e| e.player_id)
            .collect(),
    };

    let seeding_positions = standard_seeding_positions(draw_size, seeded_player_ids.len() as u32);

    // Byes go to seeds first in seed order, then to random unseeded players.
    let bye_seeded_count = (num_byes as usize).min(seeded_player_ids.len());
    let remaining_byes = num_byes as usize - bye_seeded_count;
    let mut bye_player_ids: Vec<PlayerId> =
        seeded_player_ids[..bye_seeded_count].to_vec();

    let seed_pair_indices: Vec<usize> =
        seeding_positions.iter().map(|&p| pair_index(p)).collect();

    // First-round pairs nobody seeded sits in, shuffled for random placement.
    let mut available_pairs: Vec<usize> = (0..(draw_size as usize / 2))
        .filter(|i| !seed_pair_indices.contains(i))
        .collect();
    available_pairs.shuffle(rng);

    let mut unseeded_entries: Vec<&Entry> = sorted_entries
        .iter()
        .filter(|e| !seeded_player_ids.contains(&e.player_id))
        .copied()
        .collect();
    unseeded_entries.shuffle(rng);

    if remaining_byes > unseeded_entries.len() || remaining_byes > available_pairs.len() {
        return Err(EngineError::Configuration(format!(
            "draw_id={draw_id}: cannot allocate {num_byes} byes over {num_entries} entrants"
        )));
    }
    let unseeded_bye_entries: Vec<&Entry> = unseeded_entries[..remaining_byes].to_vec();
    let unseeded_no_bye_entries: Vec<&Entry> = unseeded_entries[remaining_byes..].to_vec();
    bye_player_ids.extend(unseeded_bye_entries.iter().map(|e| e.player_id));

    // Open opponent slots next to seeds that did not draw a bye.
    let seed_opponent_positions: Vec<u32> = seeded_player_ids
        .iter()
        .zip(&seeding_positions)
        .filter(|(pid, _)| !bye_player_ids.contains(pid))
        .map(|(_, &pos)| opponent_position(pos))
        .collect();

    let mut rows: Vec<DrawPlayer> = Vec::with_capacity(num_entries as usize);
    let mut push_row = |player_id: PlayerId,
                        position: u32,
                        has_bye: bool,
                        entry_points: i64,
                        entry_timestamp: DateTime<Utc>| {
        rows.push(DrawPlayer {
            draw_id,
            player_id,
            draw_position: position,
            has_bye,
            entry_points,
            entry_timestamp,
        });
    };

    // 1. Seeds at their canonical positions.
    for (player_id, &position) in seeded_player_ids.iter().zip(&seeding_positions) {
        let entry = sorted_entries
            .iter()
            .find(|e| e.player_id == *player_id)
            .expect("seeded player validated against entries");
        push_row(
            *player_id,
            position,
            bye_player_ids.contains(player_id),
            entry.entry_points,
            entry.entry_timestamp,
        );
    }

    // 2. Unseeded players with byes: a randomly chosen slot of a fresh pair
    //    each, the opposite slot stays empty.
    let mut pair_queue = available_pairs.into_iter();
    for entry in &unseeded_bye_entries {
        let idx = pair_queue.next().expect("bye pair availability checked");
        let slot = if rng.gen_bool(0.5) { 1 } else { 2 };
        let position = (idx as u32) * 2 + slot;
        push_row(entry.player_id, position, true, entry.entry_points, entry.entry_timestamp);
    }

    // 3. Everyone else: open seed-opponent slots plus both slots of the
    //    untouched pairs, shuffled, one player per slot.
    let mut open_positions: Vec<u32> = seed_opponent_positions;
    for idx in pair_queue {
        let first = (idx as u32) * 2 + 1;
        open_positions.push(first);
        open_positions.push(first + 1);
    }
    open_positions.shuffle(rng);

    for entry in &unseeded_no_bye_entries {
        let position = open_positions.pop().ok_or_else(|| {
            EngineError::Configuration(format!(
                "draw_id={draw_id}: ran out of open positions placing player {}",
                entry.player_id
            ))
        })?;
        push_row(entry.player_id, position, false, entry.entry_points, entry.entry_timestamp);
    }

    debug!(
        draw_id,
        draw_size,
        num_entries,
        num_byes,
        seeds = seeded_player_ids.len(),
        "draw generated"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn entry(player_id: PlayerId, points: i64) -> Entry {
        Entry {
            tournament_id: 1,
            player_id,
            age_category_id: 1,
            gender_id: 1,
            entry_points: points,
            entry_timestamp: Utc::now(),
        }
    }

    fn entries(n: usize) -> Vec<Entry> {
        // Player 1 has the most points, descending from there.
        (1..=n as i64).map(|i| entry(i, 1000 - i * 10)).collect()
    }

    fn check_invariants(rows: &[DrawPlayer], draw_size: u32, expected_players: usize) {
        assert_eq!(rows.len(), expected_players);
        let positions: HashSet<u32> = rows.iter().map(|r| r.draw_position).collect();
        assert_eq!(positions.len(), rows.len(), "positions must be unique");
        assert!(positions.iter().all(|&p| (1..=draw_size).contains(&p)));
        let byes = rows.iter().filter(|r| r.has_bye).count();
        assert_eq!(byes as u32, draw_size - expected_players as u32);

        // A bye player's opposite slot must be empty; no pair may be doubly
        // occupied around a bye.
        for row in rows.iter().filter(|r| r.has_bye) {
            let opp = opponent_position(row.draw_position);
            assert!(
                !positions.contains(&opp),
                "bye player at {} has an opponent at {}",
                row.draw_position,
                opp
            );
        }
    }

    #[test]
    fn test_standard_positions_two_seeds() {
        assert_eq!(standard_seeding_positions(8, 2), vec![1, 8]);
        assert_eq!(standard_seeding_positions(64, 2), vec![1, 64]);
    }

    #[test]
    fn test_standard_positions_four_seeds() {
        assert_eq!(standard_seeding_positions(16, 4), vec![1, 16, 5, 12]);
    }

    #[test]
    fn test_standard_positions_eight_seeds() {
        let positions = standard_seeding_positions(32, 8);
        assert_eq!(positions.len(), 8);
        assert_eq!(positions[0], 1);
        assert_eq!(positions[1], 32);
        assert_eq!(
            positions.iter().collect::<HashSet<_>>().len(),
            8,
            "positions must not collide"
        );
    }

    #[test]
    fn test_standard_positions_fallback_is_anchored() {
        let positions = standard_seeding_positions(64, 16);
        assert_eq!(positions.len(), 16);
        assert_eq!(positions[0], 1);
        assert_eq!(positions[1], 64);
    }

    #[test]
    fn test_full_draw_no_byes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let e = entries(8);
        let rows = generate_draw_players(1, &e, 8, 2, None, &[], &mut rng).unwrap();
        check_invariants(&rows, 8, 8);
        // Seed 1 (most points) at position 1, seed 2 at position 8.
        let p1 = rows.iter().find(|r| r.player_id == 1).unwrap();
        let p2 = rows.iter().find(|r| r.player_id == 2).unwrap();
        assert_eq!(p1.draw_position, 1);
        assert_eq!(p2.draw_position, 8);
    }

    #[test]
    fn test_six_player_draw_gives_seeds_byes() {
        // The concrete 8-slot scenario: 6 entrants, 2 seeds, 2 byes.
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let e = entries(6);
        let rows = generate_draw_players(1, &e, 8, 2, None, &[], &mut rng).unwrap();
        check_invariants(&rows, 8, 6);

        let p1 = rows.iter().find(|r| r.player_id == 1).unwrap();
        let p2 = rows.iter().find(|r| r.player_id == 2).unwrap();
        assert_eq!(p1.draw_position, 1);
        assert!(p1.has_bye);
        assert_eq!(p2.draw_position, 8);
        assert!(p2.has_bye);
        // Opponent slots of the seeds stay empty.
        let positions: HashSet<u32> = rows.iter().map(|r| r.draw_position).collect();
        assert!(!positions.contains(&2));
        assert!(!positions.contains(&7));
    }

    #[test]
    fn test_unseeded_bye_slot_is_sampled() {
        // 8-slot draw, 2 seeds, 5 entrants: one bye goes to an unseeded
        // player, whose side of the pair must vary with the rng rather than
        // always being the odd slot.
        let mut parities = HashSet::new();
        for seed in 0..64u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let e = entries(5);
            let rows = generate_draw_players(1, &e, 8, 2, None, &[], &mut rng).unwrap();
            check_invariants(&rows, 8, 5);
            let bye = rows
                .iter()
                .find(|r| r.has_bye && r.player_id > 2)
                .expect("one unseeded bye");
            parities.insert(bye.draw_position % 2);
        }
        assert_eq!(parities.len(), 2, "both pair slots must occur");
    }

    #[test]
    fn test_byes_overflow_to_unseeded() {
        // 16-slot draw, 4 seeds, 10 entrants: 6 byes, 4 to seeds + 2 unseeded.
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let e = entries(10);
        let rows = generate_draw_players(1, &e, 16, 4, None, &[], &mut rng).unwrap();
        check_invariants(&rows, 16, 10);
        let seeded_byes = rows
            .iter()
            .filter(|r| r.has_bye && r.player_id <= 4)
            .count();
        assert_eq!(seeded_byes, 4);
    }

    #[test]
    fn test_withdrawn_player_not_placed() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let e = entries(8);
        let rows = generate_draw_players(1, &e, 8, 2, Some(3), &[], &mut rng).unwrap();
        check_invariants(&rows, 8, 7);
        assert!(rows.iter().all(|r| r.player_id != 3));
    }

    #[test]
    fn test_seed_snapshot_drives_placement() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let e = entries(8);
        // Actual snapshot reverses the natural seeding.
        let seeds = vec![
            SeedAssignment {
                draw_id: 1,
                player_id: 5,
                seed_number: 1,
                is_actual_seeding: true,
            },
            SeedAssignment {
                draw_id: 1,
                player_id: 6,
                seed_number: 2,
                is_actual_seeding: true,
            },
        ];
        let rows = generate_draw_players(1, &e, 8, 2, None, &seeds, &mut rng).unwrap();
        let p5 = rows.iter().find(|r| r.player_id == 5).unwrap();
        let p6 = rows.iter().find(|r| r.player_id == 6).unwrap();
        assert_eq!(p5.draw_position, 1);
        assert_eq!(p6.draw_position, 8);
    }

    #[test]
    fn test_seed_snapshot_with_unknown_player_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let e = entries(8);
        let seeds = vec![SeedAssignment {
            draw_id: 1,
            player_id: 99,
            seed_number: 1,
            is_actual_seeding: true,
        }];
        let err = generate_draw_players(1, &e, 8, 2, None, &seeds, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_oversubscribed_draw_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let e = entries(9);
        let err = generate_draw_players(1, &e, 8, 2, None, &[], &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_invariants_across_sizes_and_seeds() {
        for (draw_size, num_seeds) in [(8u32, 2u32), (16, 4), (32, 8), (64, 16)] {
            for n in [draw_size - 2, draw_size] {
                let mut rng = ChaCha8Rng::seed_from_u64(u64::from(draw_size * 100 + n));
                let e = entries(n as usize);
                let rows =
                    generate_draw_players(1, &e, draw_size, num_seeds, None, &[], &mut rng)
                        .unwrap();
                check_invariants(&rows, draw_size, n as usize);
            }
        }
    }
}
