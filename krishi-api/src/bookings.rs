use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use krishi_booking::{Booking, BookingAction, BookingDraft, PaymentAnomalyReport, PaymentStatus};
use krishi_core::identity::{Actor, ActorRole};
use krishi_shared::models::events::BookingAuditEvent;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::require_role;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/bookings/{booking_id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{booking_id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{booking_id}/complete", post(complete_booking))
        .route("/v1/bookings/{booking_id}/payment", post(record_payment))
        .route("/v1/bookings/{booking_id}/events", get(booking_history))
        .route("/v1/reports/payment-anomalies", get(payment_anomalies))
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdateRequest {
    pub status: PaymentStatus,
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<BookingDraft>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings
/// Bookings the caller is a party to
async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_for(&actor).await?))
}

/// GET /v1/bookings/{booking_id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get_booking(&actor, booking_id).await?))
}

/// POST /v1/bookings/{booking_id}/confirm
async fn confirm_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    transition(&state, booking_id, BookingAction::Confirm, &actor).await
}

/// POST /v1/bookings/{booking_id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    transition(&state, booking_id, BookingAction::Cancel, &actor).await
}

/// POST /v1/bookings/{booking_id}/complete
async fn complete_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    transition(&state, booking_id, BookingAction::Complete, &actor).await
}

async fn transition(
    state: &AppState,
    booking_id: Uuid,
    action: BookingAction,
    actor: &Actor,
) -> Result<Json<Booking>, AppError> {
    // Hide bookings the caller is not a party to before reporting anything else
    state.bookings.get_booking(actor, booking_id).await?;
    Ok(Json(state.bookings.transition(booking_id, action, actor).await?))
}

/// POST /v1/bookings/{booking_id}/payment
/// Payment-completion event from the vendor or an operator
async fn record_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<PaymentUpdateRequest>,
) -> Result<Json<Booking>, AppError> {
    state.bookings.get_booking(&actor, booking_id).await?;
    Ok(Json(state.bookings.record_payment(booking_id, req.status, &actor).await?))
}

/// GET /v1/bookings/{booking_id}/events
async fn booking_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Vec<BookingAuditEvent>>, AppError> {
    Ok(Json(state.bookings.history(&actor, booking_id).await?))
}

/// GET /v1/reports/payment-anomalies
async fn payment_anomalies(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<PaymentAnomalyReport>, AppError> {
    require_role(&actor, &[ActorRole::Operator])?;
    Ok(Json(state.bookings.payment_anomalies().await?))
}
