use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::domain::principal::Principal;

use super::error::ApiError;

/// Header carrying the user id authenticated by the upstream gateway.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Attaches a [`Principal`] when the gateway header is present. A header
/// that does not name a valid user is rejected outright.
pub async fn resolve_principal(mut request: Request<Body>, next: Next) -> Response {
    let Some(raw) = request.headers().get(PRINCIPAL_HEADER) else {
        return next.run(request).await;
    };

    let principal = raw
        .to_str()
        .map_err(|err| err.to_string())
        .and_then(|value| {
            value
                .trim()
                .parse::<Principal>()
                .map_err(|err| err.to_string())
        });

    match principal {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            let mut response = next.run(request).await;
            response.extensions_mut().insert(principal);
            response
        }
        Err(reason) => ApiError::unauthorized(Some(format!("invalid {PRINCIPAL_HEADER}: {reason}")))
            .with_source("infra::http::principal")
            .into_response(),
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let principal = response
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.to_string())
        .unwrap_or_default();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "quire::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                principal = principal,
                "request failed",
            );
        } else {
            warn!(
                target = "quire::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                principal = principal,
                "client request error",
            );
        }
    }

    response
}
