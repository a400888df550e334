//! Draw placement model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DrawId, PlayerId};

/// A player's slot in a single-elimination bracket.
///
/// `draw_position` is unique per draw in `1..=draw_size`. A position with no
/// row is an unoccupied slot; `has_bye` means this player's first-round
/// opponent slot is empty, not that the slot itself is a bye.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawPlayer {
    pub draw_id: DrawId,
    pub player_id: PlayerId,
    pub draw_position: u32,
    pub has_bye: bool,
    pub entry_points: i64,
    pub entry_timestamp: DateTime<Utc>,
}
