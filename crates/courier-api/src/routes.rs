//! HTTP routes: submit a delivery, poll a run, health check.

use crate::context::AppContext;
use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_run::{Manifest, Run, RunId, RunStatus};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Body returned by `POST /deliver`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub created: bool,
}

/// Build the service router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/deliver", post(deliver))
        .route("/status/:run_id", get(status))
        .route("/healthz", get(healthz))
        .with_state(ctx)
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn authorize(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;
    if constant_time_eq(presented.as_bytes(), ctx.auth_token.as_bytes()) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

async fn deliver(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(manifest): Json<Manifest>,
) -> Result<Response, ApiError> {
    authorize(&ctx, &headers)?;
    let outcome = ctx.orchestrator.submit(manifest)?;
    info!(
        run_id = %outcome.run_id,
        created = outcome.created,
        "delivery submitted"
    );
    let code = if outcome.created {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    let body = SubmitResponse {
        run_id: outcome.run_id,
        status: outcome.status,
        created: outcome.created,
    };
    Ok((code, Json(body)).into_response())
}

async fn status(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Result<Json<Run>, ApiError> {
    authorize(&ctx, &headers)?;
    let run_id = RunId::parse(&run_id).map_err(|_| ApiError::NotFound)?;
    let run = ctx.orchestrator.get(run_id).ok_or(ApiError::NotFound)?;
    Ok(Json(run))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}
