use krishi_core::repository::{DocumentStore, FieldFilter, PendingLog, StoreError, StoredDocument};
use krishi_shared::models::events::BookingAuditEvent;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus};

pub const BOOKING_COLLECTION: &str = "bookings";
pub const BOOKING_EVENT_STREAM: &str = "booking_events";

/// Typed access to bookings and their audit stream.
#[derive(Clone)]
pub struct BookingRepository {
    store: Arc<dyn DocumentStore>,
}

impl BookingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Booking plus the version to pass back to [`replace`](Self::replace).
    pub async fn get(&self, booking_id: Uuid) -> Result<Option<(Booking, i64)>, StoreError> {
        match self.store.get(BOOKING_COLLECTION, &booking_id.to_string()).await? {
            Some(doc) => {
                let version = doc.version;
                Ok(Some((decode(doc)?, version)))
            }
            None => Ok(None),
        }
    }

    /// Store a new booking together with its creation event.
    pub async fn insert(&self, booking: &Booking, event: &BookingAuditEvent) -> Result<i64, StoreError> {
        self.write(booking, None, event).await
    }

    /// Compare-and-swap write of the booking and its audit event as one unit.
    /// Fails with `VersionConflict` if someone else wrote first; then neither is stored.
    pub async fn replace(
        &self,
        booking: &Booking,
        expected_version: i64,
        event: &BookingAuditEvent,
    ) -> Result<i64, StoreError> {
        self.write(booking, Some(expected_version), event).await
    }

    pub async fn list_for_vendor(&self, vendor_id: &str) -> Result<Vec<Booking>, StoreError> {
        self.list(&[FieldFilter::eq("vendor_id", vendor_id)]).await
    }

    pub async fn list_for_farmer(&self, farmer_ref: &str) -> Result<Vec<Booking>, StoreError> {
        self.list(&[FieldFilter::eq("farmer_ref", farmer_ref)]).await
    }

    pub async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, StoreError> {
        self.list(&[FieldFilter::eq("booking_status", status.as_str())]).await
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, StoreError> {
        self.list(&[]).await
    }

    pub async fn history(&self, booking_id: Uuid) -> Result<Vec<BookingAuditEvent>, StoreError> {
        let entries = self
            .store
            .read_stream(BOOKING_EVENT_STREAM, Some(&booking_id.to_string()))
            .await?;
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry.body).map_err(StoreError::from))
            .collect()
    }

    async fn write(
        &self,
        booking: &Booking,
        expected_version: Option<i64>,
        event: &BookingAuditEvent,
    ) -> Result<i64, StoreError> {
        let body = serde_json::to_value(booking)?;
        let id = booking.booking_id.to_string();
        let log = PendingLog::new(BOOKING_EVENT_STREAM, id.clone(), serde_json::to_value(event)?);
        self.store
            .put_if_match_with_log(BOOKING_COLLECTION, &id, &body, expected_version, &log)
            .await
    }

    async fn list(&self, filters: &[FieldFilter]) -> Result<Vec<Booking>, StoreError> {
        let mut bookings = self
            .store
            .query(BOOKING_COLLECTION, filters)
            .await?
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;
        bookings.sort_by(|a, b| (a.date, a.start_time, a.created_at).cmp(&(b.date, b.start_time, b.created_at)));
        Ok(bookings)
    }
}

fn decode(doc: StoredDocument) -> Result<Booking, StoreError> {
    Ok(serde_json::from_value(doc.body)?)
}
