//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct FeedCursorPayload {
    id: i64,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "score_bits")]
    ranking_score: f64,
}

/// Scores travel as their IEEE-754 bit pattern. JSON has no spelling for
/// `NaN` or the infinities, and the store accepts both.
mod score_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(score.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

/// Position in the ranked feed, identified by the full sort key of the last
/// row the client has seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedCursor {
    id: i64,
    created_at: OffsetDateTime,
    ranking_score: f64,
}

impl FeedCursor {
    pub fn new(id: i64, created_at: OffsetDateTime, ranking_score: f64) -> Self {
        Self {
            id,
            created_at,
            ranking_score,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn ranking_score(&self) -> f64 {
        self.ranking_score
    }

    pub fn encode(&self) -> String {
        let payload = FeedCursorPayload {
            id: self.id,
            created_at: self.created_at,
            ranking_score: self.ranking_score,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing feed cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: FeedCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            id: payload.id,
            created_at: payload.created_at,
            ranking_score: payload.ranking_score,
        })
    }

    /// Lenient decoding used by the read path: anything unreadable means
    /// "start from the top".
    pub fn parse_lenient(cursor: Option<&str>) -> Option<Self> {
        let raw = cursor.map(str::trim).filter(|value| !value.is_empty())?;
        match Self::decode(raw) {
            Ok(cursor) => Some(cursor),
            Err(err) => {
                tracing::debug!(
                    target = "quire::application::pagination",
                    error = %err,
                    "ignoring malformed feed cursor"
                );
                None
            }
        }
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
