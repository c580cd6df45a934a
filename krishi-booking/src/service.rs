use krishi_catalog::directory::VendorDirectory;
use krishi_core::identity::{Actor, ActorRole};
use krishi_core::repository::{DocumentStore, StoreError};
use krishi_shared::models::events::{BookingAuditEvent, BookingEventKind};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::anomalies::PaymentAnomalyReport;
use crate::lifecycle::{BookingAction, BookingError};
use crate::models::{Booking, BookingDraft, BookingStatus, PaymentStatus};
use crate::repository::BookingRepository;

/// Creates bookings and drives their lifecycle against the store.
/// Writes to one booking are serialized by compare-and-swap on its version.
pub struct BookingService {
    bookings: BookingRepository,
    directory: Arc<VendorDirectory>,
    max_cas_retries: usize,
}

impl BookingService {
    pub fn new(store: Arc<dyn DocumentStore>, directory: Arc<VendorDirectory>, max_cas_retries: usize) -> Self {
        Self {
            bookings: BookingRepository::new(store),
            directory,
            max_cas_retries: max_cas_retries.max(1),
        }
    }

    /// Farmer requests a slot. The booking starts `pending` with payment `pending`.
    pub async fn create_booking(&self, actor: &Actor, draft: BookingDraft) -> Result<Booking, BookingError> {
        if actor.role != ActorRole::Farmer {
            return Err(BookingError::NotPermitted {
                actor: actor.role.as_str().to_string(),
                action: "create".to_string(),
            });
        }
        draft.validate()?;

        let (vendor, offering) = self
            .directory
            .get_offering(&draft.vendor_id, &draft.equipment_id)
            .await?;
        if !vendor.is_active() || !offering.is_bookable() {
            return Err(BookingError::EquipmentUnavailable(offering.equipment_id));
        }

        let calendar = self.directory.load_calendar(&vendor.vendor_id).await?;
        if !calendar.is_open(draft.date, draft.start_time) {
            return Err(BookingError::VendorClosed {
                date: draft.date.to_string(),
                time: draft.start_time.format("%H:%M").to_string(),
            });
        }

        let booking = Booking::new(actor.id.clone(), draft, &offering);
        let created = BookingAuditEvent::new(
            booking.booking_id,
            BookingEventKind::Created,
            None,
            booking.booking_status.as_str().to_string(),
            actor.id.clone(),
            actor.role.as_str().to_string(),
        );
        self.bookings.insert(&booking, &created).await?;

        info!(
            booking_id = %booking.booking_id,
            vendor_id = %booking.vendor_id,
            farmer = %booking.farmer_ref,
            total_amount = booking.total_amount,
            "Booking created"
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, BookingError> {
        let (booking, _) = self.load(booking_id).await?;
        if !booking.is_visible_to(actor) {
            // Do not reveal that the booking exists
            return Err(BookingError::NotFound(booking_id.to_string()));
        }
        Ok(booking)
    }

    /// Bookings the caller is a party to. Operators see everything.
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Booking>, BookingError> {
        let bookings = match actor.role {
            ActorRole::Vendor => self.bookings.list_for_vendor(&actor.id).await?,
            ActorRole::Farmer => self.bookings.list_for_farmer(&actor.id).await?,
            ActorRole::Operator => self.bookings.list_all().await?,
        };
        Ok(bookings)
    }

    pub async fn history(&self, actor: &Actor, booking_id: Uuid) -> Result<Vec<BookingAuditEvent>, BookingError> {
        self.get_booking(actor, booking_id).await?;
        Ok(self.bookings.history(booking_id).await?)
    }

    pub async fn transition(
        &self,
        booking_id: Uuid,
        action: BookingAction,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        let (booking, event) = self
            .update_with_retry(booking_id, |booking| booking.apply(action, actor).map(Some))
            .await?;

        if let Some(event) = &event {
            info!(
                booking_id = %booking_id,
                from = event.from_status.as_deref().unwrap_or_default(),
                to = %event.to_status,
                actor = %actor.role.as_str(),
                "Booking transitioned"
            );
        }
        Ok(booking)
    }

    /// Apply a payment-completion event. Never gated on booking status.
    pub async fn record_payment(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        let (booking, event) = self
            .update_with_retry(booking_id, |booking| booking.record_payment(status, actor))
            .await?;

        if event.is_some() {
            info!(booking_id = %booking_id, payment_status = status.as_str(), "Payment status updated");
        }
        Ok(booking)
    }

    pub async fn payment_anomalies(&self) -> Result<PaymentAnomalyReport, BookingError> {
        let completed = self.bookings.list_by_status(BookingStatus::Completed).await?;
        let report = PaymentAnomalyReport::from_bookings(&completed);
        if !report.anomalies.is_empty() {
            warn!(
                count = report.anomalies.len(),
                outstanding = report.outstanding_amount,
                "Completed bookings awaiting payment"
            );
        }
        Ok(report)
    }

    async fn load(&self, booking_id: Uuid) -> Result<(Booking, i64), BookingError> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_id.to_string()))
    }

    /// Read, mutate, compare-and-swap. On a lost race the fresh state is re-read and the
    /// mutation re-validated against it, so a stale caller sees `InvalidTransition`.
    async fn update_with_retry<F>(
        &self,
        booking_id: Uuid,
        mut mutate: F,
    ) -> Result<(Booking, Option<BookingAuditEvent>), BookingError>
    where
        F: FnMut(&mut Booking) -> Result<Option<BookingAuditEvent>, BookingError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (mut booking, version) = self.load(booking_id).await?;
            let event = mutate(&mut booking)?;

            // No-op: nothing to write
            let Some(event) = event else {
                return Ok((booking, None));
            };

            match self.bookings.replace(&booking, version, &event).await {
                Ok(_) => return Ok((booking, Some(event))),
                Err(StoreError::VersionConflict { .. }) if attempts < self.max_cas_retries => {
                    warn!(booking_id = %booking_id, attempts, "Booking changed concurrently, retrying");
                }
                Err(StoreError::VersionConflict { .. }) => {
                    return Err(BookingError::Conflict(booking_id.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
