use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a booking, as recorded in the append-only audit stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    Created,
    StatusChanged,
    PaymentChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingAuditEvent {
    pub event_id: Uuid,
    pub booking_id: Uuid,
    pub kind: BookingEventKind,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_id: String,
    pub actor_role: String,
    pub recorded_at: DateTime<Utc>,
}

impl BookingAuditEvent {
    pub fn new(
        booking_id: Uuid,
        kind: BookingEventKind,
        from_status: Option<String>,
        to_status: String,
        actor_id: String,
        actor_role: String,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            booking_id,
            kind,
            from_status,
            to_status,
            actor_id,
            actor_role,
            recorded_at: Utc::now(),
        }
    }
}

/// Emitted when a vendor explicitly accepts a listing price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfirmedEvent {
    pub vendor_id: String,
    pub equipment_id: String,
    pub previous_price: f64,
    pub confirmed_price: f64,
    pub pricing_unit: String,
    pub suggested_price: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
