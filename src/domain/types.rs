//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "article_status", rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

/// Coarse lifecycle bucket assigned by the scoring worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "article_tier", rename_all = "snake_case")]
pub enum ArticleTier {
    #[serde(rename = "tier_0_pending")]
    #[sqlx(rename = "tier_0_pending")]
    Pending,
    #[serde(rename = "tier_1_discovery")]
    #[sqlx(rename = "tier_1_discovery")]
    Discovery,
    #[serde(rename = "tier_2_growth")]
    #[sqlx(rename = "tier_2_growth")]
    Growth,
    #[serde(rename = "tier_3_viral")]
    #[sqlx(rename = "tier_3_viral")]
    Viral,
    Archived,
}

impl ArticleTier {
    /// Tiers eligible for the public feed.
    pub const FEED_VISIBLE: [ArticleTier; 4] = [
        ArticleTier::Pending,
        ArticleTier::Discovery,
        ArticleTier::Growth,
        ArticleTier::Viral,
    ];

    pub fn is_feed_visible(self) -> bool {
        Self::FEED_VISIBLE.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

/// Engagement signals recorded by the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "interaction_kind", rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Upvote,
    Save,
    Comment,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Upvote => "upvote",
            InteractionKind::Save => "save",
            InteractionKind::Comment => "comment",
        }
    }

    /// Counter column incremented for this interaction.
    pub fn counter_column(self) -> &'static str {
        match self {
            InteractionKind::View => "view_count",
            InteractionKind::Upvote => "upvote_count",
            InteractionKind::Save => "save_count",
            InteractionKind::Comment => "comment_count",
        }
    }
}

/// Entity kinds whose scores are recomputed asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringEntity {
    Article,
    User,
}

impl ScoringEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringEntity::Article => "article",
            ScoringEntity::User => "user",
        }
    }

    pub fn job_type(self) -> JobType {
        match self {
            ScoringEntity::Article => JobType::RecalcArticleScores,
            ScoringEntity::User => JobType::RecalcUserScores,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    RecalcArticleScores,
    RecalcUserScores,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::RecalcArticleScores => "recalc_article_scores",
            JobType::RecalcUserScores => "recalc_user_scores",
        }
    }
}

impl TryFrom<&str> for JobType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "recalc_article_scores" => Ok(JobType::RecalcArticleScores),
            "recalc_user_scores" => Ok(JobType::RecalcUserScores),
            _ => Err(()),
        }
    }
}
