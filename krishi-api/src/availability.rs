use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use krishi_catalog::availability::{parse_clock, parse_weekday};
use krishi_catalog::AvailabilityCalendar;
use krishi_core::identity::Actor;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;
use crate::vendors::ensure_vendor_owner;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/vendors/{vendor_id}/availability", get(get_calendar))
        .route("/v1/vendors/{vendor_id}/availability/open", get(is_open))
        .route(
            "/v1/vendors/{vendor_id}/availability/blocked-dates/{date}",
            post(toggle_blocked_date),
        )
        .route(
            "/v1/vendors/{vendor_id}/availability/operating-days/{weekday}",
            put(set_operating_day),
        )
}

#[derive(Debug, Deserialize)]
pub struct OperatingDayRequest {
    pub enabled: bool,
    /// "HH:MM"
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct BlockedDateResponse {
    pub date: NaiveDate,
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct OpenResponse {
    pub open: bool,
}

/// GET /v1/vendors/{vendor_id}/availability
async fn get_calendar(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> Result<Json<AvailabilityCalendar>, AppError> {
    state.directory.get_vendor(&vendor_id).await?;
    Ok(Json(state.directory.load_calendar(&vendor_id).await?))
}

/// GET /v1/vendors/{vendor_id}/availability/open?date=YYYY-MM-DD&time=HH:MM
async fn is_open(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
    Query(query): Query<OpenQuery>,
) -> Result<Json<OpenResponse>, AppError> {
    let time = parse_clock(&query.time)?;
    let calendar = state.directory.load_calendar(&vendor_id).await?;
    Ok(Json(OpenResponse {
        open: calendar.is_open(query.date, time),
    }))
}

/// POST /v1/vendors/{vendor_id}/availability/blocked-dates/{date}
/// Flip a date between blocked and open
async fn toggle_blocked_date(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((vendor_id, date)): Path<(String, NaiveDate)>,
) -> Result<Json<BlockedDateResponse>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, false)?;

    let mut calendar = state.directory.load_calendar(&vendor_id).await?;
    let blocked = calendar.toggle_blocked(date);
    state.directory.save_calendar(&calendar).await?;

    tracing::info!(%vendor_id, %date, blocked, "Blocked date toggled");
    Ok(Json(BlockedDateResponse { date, blocked }))
}

/// PUT /v1/vendors/{vendor_id}/availability/operating-days/{weekday}
async fn set_operating_day(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((vendor_id, weekday)): Path<(String, String)>,
    Json(req): Json<OperatingDayRequest>,
) -> Result<Json<AvailabilityCalendar>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, false)?;
    let day = parse_weekday(&weekday)?;
    let start = parse_clock(&req.start)?;
    let end = parse_clock(&req.end)?;

    let mut calendar = state.directory.load_calendar(&vendor_id).await?;
    calendar.set_operating_day(day, req.enabled, start, end)?;
    state.directory.save_calendar(&calendar).await?;

    tracing::info!(%vendor_id, %day, enabled = req.enabled, "Operating hours updated");
    Ok(Json(calendar))
}
