//! Resolve and stats routes.
//!
//! The resolve handler is the single inbound operation: it gates on the
//! API key ledger first (a rejected key causes zero provider or cache
//! calls), then hands the query to the resolution service and maps each
//! terminal state onto an HTTP status mirrored in the body.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tunevault_common::Error;
use tunevault_db::models::MediaRecord;
use tunevault_db::pool::get_conn;
use tunevault_db::queries::api_keys;

use crate::providers::MediaMeta;
use crate::resolve::Resolution;
use crate::server::AppContext;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/resolve", get(resolve))
        .route("/stats", get(stats))
}

#[derive(Deserialize)]
struct ResolveParams {
    query: String,
    #[serde(default)]
    key: Option<String>,
}

/// Wire shape of a resolution answer; `status` mirrors the HTTP status.
#[derive(Debug, Serialize)]
struct ResolveResponse {
    status: u16,
    title: Option<String>,
    duration: Option<String>,
    link: Option<String>,
    media_id: Option<String>,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    response_time_ms: u64,
}

impl ResolveResponse {
    fn resolved(record: MediaRecord, started: Instant) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            title: Some(record.title),
            duration: Some(record.duration),
            link: Some(record.durable_link),
            media_id: Some(record.media_id),
            cached: true,
            message: None,
            note: None,
            error: None,
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn accepted(meta: MediaMeta, started: Instant) -> Self {
        Self {
            status: StatusCode::ACCEPTED.as_u16(),
            title: Some(meta.title),
            duration: meta.duration_secs.map(crate::resolver::format_duration),
            link: None,
            media_id: Some(meta.media_id),
            cached: false,
            message: Some("Media is being processed. Please retry in a few seconds.".to_string()),
            note: Some(
                "First-time fetches can take a couple of minutes; repeat queries are instant."
                    .to_string(),
            ),
            error: None,
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn failure(status: StatusCode, error: &str, started: Instant) -> Self {
        Self {
            status: status.as_u16(),
            title: None,
            duration: None,
            link: None,
            media_id: None,
            cached: false,
            message: None,
            note: None,
            error: Some(error.to_string()),
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

impl IntoResponse for ResolveResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

async fn resolve(
    State(ctx): State<AppContext>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let started = Instant::now();

    if ctx.config.auth.required {
        match check_key(&ctx, params.key.as_deref()) {
            Ok(true) => {}
            Ok(false) => {
                return ResolveResponse::failure(
                    StatusCode::FORBIDDEN,
                    "Invalid or expired API key",
                    started,
                )
                .into_response();
            }
            Err(e) => {
                return ResolveResponse::failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &e.to_string(),
                    started,
                )
                .into_response();
            }
        }
    }

    match ctx.service.resolve(&params.query).await {
        Ok(Resolution::Resolved(record)) => {
            ResolveResponse::resolved(record, started).into_response()
        }
        Ok(Resolution::Accepted(meta)) => ResolveResponse::accepted(meta, started).into_response(),
        Ok(Resolution::NotFound) => ResolveResponse::failure(
            StatusCode::NOT_FOUND,
            "No media matched the query",
            started,
        )
        .into_response(),
        Err(e) => ResolveResponse::failure(status_for(&e), &e.to_string(), started).into_response(),
    }
}

/// Verify the key against the ledger and consume one unit of quota.
fn check_key(ctx: &AppContext, key: Option<&str>) -> tunevault_common::Result<bool> {
    let Some(key) = key else {
        return Ok(false);
    };
    let conn = get_conn(&ctx.db)?;
    api_keys::verify_and_consume(&conn, key, Utc::now())
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::AuthRejected => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn stats(State(ctx): State<AppContext>) -> Response {
    match ctx.service.resolved_count() {
        Ok(count) => Json(serde_json::json!({ "resolved_records": count })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
