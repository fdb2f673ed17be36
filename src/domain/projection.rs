//! Denormalized article projections served by the feed.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::domain::entities::{ArticleSource, CategoryRecord, PlaceRecord};

pub const EXCERPT_CHARS: usize = 150;
pub const EXCERPT_ELLIPSIS: &str = "...";
pub const UNKNOWN_AUTHOR: &str = "Unknown";
const AVATAR_PLACEHOLDER_BASE: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCard {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub author: AuthorCard,
    pub tags: Vec<String>,
    pub category: Option<CategoryRef>,
    pub location: Option<Location>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Projection {
    pub fn from_source(source: ArticleSource) -> Self {
        let author = author_card(
            source.author_display_name.as_deref(),
            source.author_email.as_deref(),
            source.author_avatar_url.as_deref(),
        );
        Self {
            id: source.id,
            title: source.title,
            excerpt: excerpt(&source.content),
            author,
            tags: source.tags,
            category: source.category.map(CategoryRef::from),
            location: source.place.and_then(Location::from_place),
            created_at: source.created_at,
        }
    }
}

impl From<CategoryRecord> for CategoryRef {
    fn from(record: CategoryRecord) -> Self {
        Self {
            name: record.name,
            slug: record.slug,
        }
    }
}

impl Location {
    /// Places without both coordinates are not locations.
    pub fn from_place(place: PlaceRecord) -> Option<Self> {
        Some(Self {
            lat: place.lat?,
            lng: place.lng?,
            name: place.name,
        })
    }
}

/// Builds the public author card shared by feed items and leaderboard rows.
pub fn author_card(
    display_name: Option<&str>,
    email: Option<&str>,
    avatar_url: Option<&str>,
) -> AuthorCard {
    let name = display_name_for(display_name, email);
    let avatar = match avatar_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => url.to_string(),
        None => placeholder_avatar(&name),
    };
    AuthorCard { name, avatar }
}

pub fn display_name_for(display_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = display_name.map(str::trim).filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    email
        .and_then(|email| email.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

pub fn placeholder_avatar(name: &str) -> String {
    match Url::parse_with_params(AVATAR_PLACEHOLDER_BASE, &[("name", name)]) {
        Ok(url) => url.to_string(),
        Err(_) => AVATAR_PLACEHOLDER_BASE.to_string(),
    }
}

/// Truncates on character boundaries and marks the cut.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + EXCERPT_ELLIPSIS.len());
            out.push_str(&content[..cut]);
            out.push_str(EXCERPT_ELLIPSIS);
            out
        }
        None => content.to_string(),
    }
}
