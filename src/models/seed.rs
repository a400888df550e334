//! Seed assignment snapshots.

use serde::{Deserialize, Serialize};

use super::{DrawId, PlayerId};

/// One seed slot in a draw's seeding snapshot.
///
/// Two snapshots may coexist per draw: the planned seeding computed at the
/// entry deadline (`is_actual_seeding = false`) and, only after a seeded
/// pre-draw withdrawal, the recomputed actual seeding
/// (`is_actual_seeding = true`). When the actual snapshot exists it is
/// authoritative for placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAssignment {
    pub draw_id: DrawId,
    pub player_id: PlayerId,
    /// 1-based; seed 1 is the strongest entrant.
    pub seed_number: u32,
    pub is_actual_seeding: bool,
}
