use krishi_catalog::directory::DirectoryError;
use krishi_core::identity::Actor;
use krishi_core::repository::StoreError;
use krishi_core::CoreError;
use krishi_shared::models::events::{BookingAuditEvent, BookingEventKind};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus, PaymentStatus};

/// Actions a party can take on a booking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Cancel,
    Complete,
}

impl BookingAction {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Cancel => BookingStatus::Cancelled,
            BookingAction::Complete => BookingStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Cancel => "cancel",
            BookingAction::Complete => "complete",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Invalid payment change from {from} to {to}")]
    InvalidPaymentChange {
        from: String,
        to: String,
    },

    #[error("{actor} may not {action} this booking")]
    NotPermitted {
        actor: String,
        action: String,
    },

    #[error("Vendor is closed on {date} at {time}")]
    VendorClosed {
        date: String,
        time: String,
    },

    #[error("Equipment {0} is not available for booking")]
    EquipmentUnavailable(String),

    #[error("Booking {0} is being modified concurrently, try again")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Booking {
    /// Whether `actor` is allowed to perform `action`, regardless of current state.
    fn authorize(&self, action: BookingAction, actor: &Actor) -> Result<(), BookingError> {
        let allowed = match action {
            BookingAction::Confirm | BookingAction::Complete => actor.is_vendor(&self.vendor_id),
            BookingAction::Cancel => {
                actor.is_vendor(&self.vendor_id)
                    || actor.is_farmer(self.farmer_ref.expose())
                    || actor.is_operator()
            }
        };

        if !allowed {
            return Err(BookingError::NotPermitted {
                actor: actor.role.as_str().to_string(),
                action: action.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Whether this booking may be viewed by `actor`.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_operator() || actor.is_vendor(&self.vendor_id) || actor.is_farmer(self.farmer_ref.expose())
    }

    /// Transition: Pending → Confirmed (vendor accepts)
    pub fn confirm(&mut self, actor: &Actor) -> Result<BookingAuditEvent, BookingError> {
        self.apply(BookingAction::Confirm, actor)
    }

    /// Transition: Pending | Confirmed → Cancelled
    pub fn cancel(&mut self, actor: &Actor) -> Result<BookingAuditEvent, BookingError> {
        self.apply(BookingAction::Cancel, actor)
    }

    /// Transition: Confirmed → Completed (work done)
    pub fn complete(&mut self, actor: &Actor) -> Result<BookingAuditEvent, BookingError> {
        self.apply(BookingAction::Complete, actor)
    }

    pub fn apply(&mut self, action: BookingAction, actor: &Actor) -> Result<BookingAuditEvent, BookingError> {
        self.authorize(action, actor)?;

        let from = self.booking_status;
        let to = action.target();
        let legal = matches!(
            (from, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        );

        if !legal {
            return Err(BookingError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        self.update_status(to);
        Ok(BookingAuditEvent::new(
            self.booking_id,
            BookingEventKind::StatusChanged,
            Some(from.as_str().to_string()),
            to.as_str().to_string(),
            actor.id.clone(),
            actor.role.as_str().to_string(),
        ))
    }

    /// Apply a payment-completion event. Repeating the current status is a no-op (`Ok(None)`).
    pub fn record_payment(
        &mut self,
        status: PaymentStatus,
        actor: &Actor,
    ) -> Result<Option<BookingAuditEvent>, BookingError> {
        if !(actor.is_operator() || actor.is_vendor(&self.vendor_id)) {
            return Err(BookingError::NotPermitted {
                actor: actor.role.as_str().to_string(),
                action: "record payment for".to_string(),
            });
        }

        let from = self.payment_status;
        if from == status {
            return Ok(None);
        }
        if !from.can_change_to(status) {
            return Err(BookingError::InvalidPaymentChange {
                from: from.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        self.update_payment(status);
        Ok(Some(BookingAuditEvent::new(
            self.booking_id,
            BookingEventKind::PaymentChanged,
            Some(from.as_str().to_string()),
            status.as_str().to_string(),
            actor.id.clone(),
            actor.role.as_str().to_string(),
        )))
    }
}
