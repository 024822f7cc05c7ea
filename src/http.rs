//! HTTP boundary: maps [`BrewOutcome`]s and [`BrewError`]s to responses.
//!
//! | Outcome | Status |
//! |---|---|
//! | `Brewed` | 200 with `{ message, prepared }` |
//! | `Teapot` | 418 |
//! | `Unavailable` | 503 |
//! | rate limited | 429 (from [`RateLimitLayer`]) |
//! | error | 500 with a problem-details body |

use crate::error::BrewError;
use crate::orchestrator::{BrewOutcome, Brewer};
use crate::rate_limit::{RateLimitLayer, RateLimiter};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const BREW_PATH: &str = "/brew-coffee";

/// Body of a successful brew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrewResponse {
    pub message: String,
    /// ISO-8601 with offset, e.g. `2025-06-15T09:30:00+08:00`.
    pub prepared: String,
}

/// RFC 7807 problem body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
}

impl ProblemDetails {
    fn internal() -> Self {
        Self {
            kind: "https://tools.ietf.org/html/rfc9110#section-15.6.1".to_string(),
            title: "An error occurred while processing your request.".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        response
    }
}

impl IntoResponse for BrewOutcome {
    fn into_response(self) -> Response {
        match self {
            BrewOutcome::Brewed(brewed) => {
                let body = BrewResponse {
                    message: brewed.message().to_string(),
                    prepared: brewed.prepared_string(),
                };
                (StatusCode::OK, Json(body)).into_response()
            }
            BrewOutcome::Teapot => StatusCode::IM_A_TEAPOT.into_response(),
            BrewOutcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

impl IntoResponse for BrewError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "brew request failed");
        ProblemDetails::internal().into_response()
    }
}

async fn brew_coffee(State(brewer): State<Arc<Brewer>>) -> Result<BrewOutcome, BrewError> {
    brewer.handle_request().await
}

/// Router serving [`BREW_PATH`] behind `limiter`.
pub fn router<L>(brewer: Arc<Brewer>, limiter: Arc<L>) -> Router
where
    L: RateLimiter + 'static,
{
    Router::new()
        .route(BREW_PATH, get(brew_coffee))
        .route_layer(RateLimitLayer::from_shared(limiter))
        .with_state(brewer)
}
