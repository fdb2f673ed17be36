//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod leaderboard;
pub mod principal;
pub mod projection;
pub mod types;
