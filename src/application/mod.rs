//! Application services: feed assembly, caching policy, scoring triggers.

pub mod engagement;
pub mod error;
pub mod feed;
pub mod feed_index;
pub mod jobs;
pub mod leaderboard;
pub mod pagination;
pub mod projections;
pub mod repos;
pub mod scoring;
pub mod stats;
