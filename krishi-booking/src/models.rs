use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use krishi_catalog::vendor::EquipmentOffering;
use krishi_core::geo::Coordinates;
use krishi_core::units::PricingUnit;
use krishi_core::{CoreError, CoreResult};
use krishi_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

/// Tracked independently of [`BookingStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    /// `paid` is final; a failed payment may be retried.
    pub fn can_change_to(&self, next: PaymentStatus) -> bool {
        match (self, next) {
            (PaymentStatus::Paid, _) => false,
            (PaymentStatus::Pending, PaymentStatus::Paid | PaymentStatus::Failed) => true,
            (PaymentStatus::Failed, PaymentStatus::Paid | PaymentStatus::Pending) => true,
            _ => false,
        }
    }
}

/// Quantity in the offering's pricing unit: acres, days or hours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BookingDuration {
    pub quantity: f64,
    pub unit: PricingUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmerLocation {
    pub coordinates: Coordinates,
    #[serde(default)]
    pub address: Option<String>,
}

/// What a farmer submits to request a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub vendor_id: String,
    pub equipment_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub quantity: f64,
    #[serde(default)]
    pub farmer_location: Option<FarmerLocation>,
}

impl BookingDraft {
    pub fn validate(&self) -> CoreResult<()> {
        if self.vendor_id.trim().is_empty() || self.equipment_id.trim().is_empty() {
            return Err(CoreError::ValidationError("vendor_id and equipment_id are required".into()));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(CoreError::ValidationError("quantity must be greater than zero".into()));
        }
        if let Some(location) = &self.farmer_location {
            if !location.coordinates.is_valid() {
                return Err(CoreError::ValidationError("farmer_location coordinates out of range".into()));
            }
        }
        Ok(())
    }
}

/// A farmer's reservation of one vendor offering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub vendor_id: String,
    pub equipment_id: String,
    pub equipment_name: String,
    pub farmer_ref: Masked<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: BookingDuration,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
    #[serde(default)]
    pub farmer_location: Option<FarmerLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once, when the booking enters `completed`.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// New `pending` booking priced from the offering's current listing.
    pub fn new(farmer_ref: String, draft: BookingDraft, offering: &EquipmentOffering) -> Self {
        let now = Utc::now();
        let total = (offering.price_per_unit * draft.quantity * 100.0).round() / 100.0;
        Self {
            booking_id: Uuid::new_v4(),
            vendor_id: draft.vendor_id,
            equipment_id: offering.equipment_id.clone(),
            equipment_name: offering.name.clone(),
            farmer_ref: Masked::new(farmer_ref),
            date: draft.date,
            start_time: draft.start_time,
            duration: BookingDuration {
                quantity: draft.quantity,
                unit: offering.pricing_unit,
            },
            total_amount: total,
            payment_status: PaymentStatus::Pending,
            booking_status: BookingStatus::Pending,
            farmer_location: draft.farmer_location,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn update_status(&mut self, new_status: BookingStatus) {
        let now = Utc::now();
        if new_status == BookingStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.booking_status = new_status;
        self.updated_at = now;
    }

    pub fn update_payment(&mut self, new_status: PaymentStatus) {
        self.payment_status = new_status;
        self.updated_at = Utc::now();
    }

    /// Completed work that has not been paid for.
    pub fn is_payment_anomaly(&self) -> bool {
        self.booking_status == BookingStatus::Completed && self.payment_status == PaymentStatus::Pending
    }
}
