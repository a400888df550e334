//! Score validation and generation.

pub mod generate;
pub mod validate;

pub use generate::{GeneratedScore, ScoreGenerator};
pub use validate::{validate, validate_draw_size, validate_player_schedule, ScoreReport};
