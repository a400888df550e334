//! Core data models for the tournament engine.

mod draw;
mod entry;
mod ids;
mod matches;
mod points;
mod seed;
mod suspension;
mod tournament;

pub use draw::*;
pub use entry::*;
pub use ids::*;
pub use matches::*;
pub use points::*;
pub use seed::*;
pub use suspension::*;
pub use tournament::*;
