use std::sync::Arc;

use crate::application::engagement::EngagementService;
use crate::application::feed::FeedService;
use crate::application::leaderboard::LeaderboardService;
use crate::application::repos::HealthRepo;

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub leaderboard: Arc<LeaderboardService>,
    pub engagement: Arc<EngagementService>,
    pub health: Arc<dyn HealthRepo>,
}
