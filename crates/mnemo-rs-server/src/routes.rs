//! Route handlers.

use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use log::{debug, info};
use mnemo_rs_core::DEFAULT_SEARCH_LIMIT;
use mnemo_rs_protocol::{
    SearchRequest, SearchResponse, SessionId, SummaryView, TurnRequest, TurnResponse,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Submit one user turn.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(request) = payload?;
    info!(
        "chat turn received (session_id={}, message_len={})",
        request.session_id,
        request.message.len()
    );
    let response = state
        .memory
        .submit_turn(&request.session_id, &request.message)
        .await?;
    Ok(Json(response))
}

/// Rank earlier messages of a session by similarity to a query.
pub async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    debug!(
        "search received (session_id={}, limit={})",
        request.session_id, limit
    );
    let results = state
        .memory
        .search(&request.session_id, &request.query, limit)
        .await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Debug, Serialize)]
pub struct SummariesResponse {
    pub summaries: Vec<SummaryView>,
}

pub async fn summaries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SummariesResponse>, ApiError> {
    let session_id = SessionId::parse(id)?;
    let summaries = state.memory.summaries(&session_id).await?;
    Ok(Json(SummariesResponse { summaries }))
}
