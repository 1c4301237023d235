// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: SSE subscriptions and event publishing

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query as QueryParams, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sift_core::{Event, Query};
use sift_engine::{Bus, BusError, Subscription};
use sift_pattern::parse_pattern;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Undelivered batches buffered per SSE connection
const SUBSCRIPTION_BUFFER: usize = 16;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub bus: Bus,
    pub cancel: CancellationToken,
    /// Events per SSE connection before it is closed
    pub session_limit: usize,
}

impl AppState {
    pub fn new(bus: Bus, cancel: CancellationToken, session_limit: usize) -> Self {
        Self {
            bus,
            cancel,
            session_limit,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(stream_events).post(stream_events))
        .route("/events/stream", get(stream_events).post(stream_events))
        .route("/events", post(publish_events))
        .route("/health", get(health))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    limit: Option<String>,
    replay: Option<String>,
}

/// GET|POST / and /events/stream
///
/// The optional body is a pattern document; `limit` and `replay` tune the
/// replay that precedes live events.
async fn stream_events(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<StreamParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let query = parse_stream_request(&params, &body)?;
    debug!(
        replay = query.replay,
        limit = query.limit,
        filter = %query.filter,
        "stream requested"
    );

    let subscription = state
        .bus
        .subscribe(&state.cancel, query, SUBSCRIPTION_BUFFER)
        .await?;
    info!(consumer = %subscription.id(), "stream opened");

    let stream = sse_stream(subscription, state.session_limit);
    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    Ok((
        headers,
        Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)),
    )
        .into_response())
}

/// POST /events
///
/// Accepts one event object or an array of them.
async fn publish_events(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let batch = parse_batch(&body)?;
    let accepted = batch.len();
    state.bus.publish(&state.cancel, batch).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": accepted }))))
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

// =============================================================================
// Request parsing
// =============================================================================

pub fn parse_stream_request(params: &StreamParams, body: &[u8]) -> Result<Query, ApiError> {
    let mut query = Query::default();

    if let Some(limit) = params.limit.as_deref().filter(|s| !s.is_empty()) {
        query.limit = limit
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("bad limit {limit}: {e}")))?;
    }

    if let Some(replay) = params.replay.as_deref() {
        match replay.to_ascii_lowercase().as_str() {
            "true" => query.replay = true,
            "false" => query.replay = false,
            "" => {}
            _ => return Err(ApiError::BadRequest(format!("bad replay {replay}"))),
        }
    }

    if !body.iter().all(u8::is_ascii_whitespace) {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("bad filter: {e}")))?;
        query.filter = parse_pattern(&document)
            .map_err(|e| ApiError::BadRequest(format!("bad filter: {e}")))?;
    }

    Ok(query)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Incoming {
    Batch(Vec<Event>),
    One(Event),
}

fn parse_batch(body: &[u8]) -> Result<Vec<Event>, ApiError> {
    let incoming: Incoming = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("bad events: {e}")))?;
    Ok(match incoming {
        Incoming::Batch(batch) => batch,
        Incoming::One(event) => vec![event],
    })
}

// =============================================================================
// SSE framing
// =============================================================================

/// Flatten a subscription into SSE records, ending after `limit` events
///
/// The subscription travels with the stream, so dropping the stream
/// (client gone or limit reached) unregisters the consumer.
fn sse_stream(
    subscription: Subscription,
    limit: usize,
) -> impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static {
    stream::unfold(subscription, |mut sub| async move {
        let batch = sub.recv().await?;
        Some((stream::iter(batch), sub))
    })
    .flatten()
    .take(limit)
    .map(|event| Ok(sse_record(&event)))
}

/// One record per event: `event:` from the type, `id:` from the id, and the
/// serialized event as `data:`
pub fn sse_record(event: &Event) -> SseEvent {
    let mut record = SseEvent::default();
    if let Some(kind) = event.kind.as_deref().filter(|s| is_field_safe(s)) {
        record = record.event(kind);
    }
    if let Some(id) = event.id.as_deref().filter(|s| is_field_safe(s)) {
        record = record.id(id);
    }
    let data = serde_json::to_string(event).unwrap_or_else(|_| "null".to_string());
    record.data(data)
}

/// SSE field values cannot span lines
fn is_field_safe(s: &str) -> bool {
    !s.contains(['\n', '\r', '\0'])
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned to HTTP clients as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

impl From<BusError> for ApiError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::Parse(_) => Self::BadRequest(e.to_string()),
            BusError::Canceled | BusError::Closed => Self::Unavailable(e.to_string()),
            BusError::Timeout | BusError::Store(_) => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
