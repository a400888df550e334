//! Points history and weekly ranking engines.

pub mod points;
pub mod weekly;

pub use points::{calculate_points_history, infer_stage, StageOutcome};
pub use weekly::weekly_ranking;
