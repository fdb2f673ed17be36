use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::application::error::ErrorReport;
use crate::application::pagination::{FeedCursor, PageRequest};
use crate::domain::principal::Principal;
use crate::domain::types::InteractionKind;

use super::error::{ApiError, codes};
use super::state::HttpState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionBody {
    pub kind: InteractionKind,
}

fn require_principal(principal: Option<Extension<Principal>>) -> Result<Principal, ApiError> {
    principal
        .map(|Extension(principal)| principal)
        .ok_or_else(|| ApiError::unauthorized(None))
}

fn page_request(state: &HttpState, query: &FeedQuery) -> PageRequest<FeedCursor> {
    let limit = state.feed.index().limits().clamp(query.limit);
    PageRequest::new(limit, FeedCursor::parse_lenient(query.cursor.as_deref()))
}

pub async fn feed(
    State(state): State<HttpState>,
    principal: Option<Extension<Principal>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = require_principal(principal)?;
    let request = page_request(&state, &query);
    let page = state.feed.feed_for_user(viewer, request).await?;
    Ok(Json(page))
}

pub async fn feed_index(
    State(state): State<HttpState>,
    principal: Option<Extension<Principal>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = require_principal(principal)?;
    let request = page_request(&state, &query);
    let page = state
        .feed
        .index()
        .feed_index(viewer, request)
        .await
        .map_err(|err| ApiError::from_repo("infra::http::feed_index", err))?;
    Ok(Json(page))
}

pub async fn leaderboard(
    State(state): State<HttpState>,
    principal: Option<Extension<Principal>>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = principal.map(|Extension(principal)| principal);
    let view = state.leaderboard.top_users(viewer).await?;
    Ok(Json(view))
}

pub async fn record_interaction(
    State(state): State<HttpState>,
    principal: Option<Extension<Principal>>,
    Path(article_id): Path<i64>,
    Json(body): Json<InteractionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_principal(principal)?;
    let receipt = state
        .engagement
        .record_interaction(principal, article_id, body.kind)
        .await?;
    Ok(Json(receipt))
}

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn readyz(State(state): State<HttpState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::readyz",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Fallback for unknown routes so they share the JSON error shape.
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "route not found", None)
}
