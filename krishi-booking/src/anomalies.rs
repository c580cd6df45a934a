use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Booking;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentAnomaly {
    pub booking_id: Uuid,
    pub vendor_id: String,
    pub equipment_id: String,
    pub date: NaiveDate,
    pub total_amount: f64,
    pub completed_at: DateTime<Utc>,
}

/// Completed bookings still waiting for payment. Surfaced to operators, never enforced.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentAnomalyReport {
    pub generated_at: DateTime<Utc>,
    pub outstanding_amount: f64,
    pub anomalies: Vec<PaymentAnomaly>,
}

impl PaymentAnomalyReport {
    pub fn from_bookings(bookings: &[Booking]) -> Self {
        let anomalies: Vec<PaymentAnomaly> = bookings
            .iter()
            .filter(|b| b.is_payment_anomaly())
            .map(|b| PaymentAnomaly {
                booking_id: b.booking_id,
                vendor_id: b.vendor_id.clone(),
                equipment_id: b.equipment_id.clone(),
                date: b.date,
                total_amount: b.total_amount,
                completed_at: b.completed_at.unwrap_or(b.updated_at),
            })
            .collect();

        let outstanding = anomalies.iter().map(|a| a.total_amount).sum::<f64>();

        Self {
            generated_at: Utc::now(),
            outstanding_amount: (outstanding * 100.0).round() / 100.0,
            anomalies,
        }
    }
}
