use axum::{extract::State, routing::post, Extension, Json, Router};
use krishi_core::identity::{Actor, ActorRole};
use krishi_match::{FarmerRequest, MatchResult};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::require_role;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/matches", post(match_vendors))
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub candidates_considered: usize,
    pub matches: Vec<MatchResult>,
}

/// POST /v1/matches
/// Rank vendors in the farmer's district for the requested service
async fn match_vendors(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<FarmerRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    require_role(&actor, &[ActorRole::Farmer, ActorRole::Operator])?;
    req.validate()?;

    let candidates = state
        .directory
        .find_candidates(Some(&req.district), Some(&req.service_needed))
        .await?;
    let candidates_considered = candidates.len();

    // Scoring is CPU-bound; keep it off the async workers.
    let scorer = state.scorer.clone();
    let matches = tokio::task::spawn_blocking(move || scorer.match_vendors(&req, &candidates))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Scoring task failed: {}", e)))??;

    Ok(Json(MatchResponse {
        candidates_considered,
        matches,
    }))
}
