use chrono::{DateTime, Utc};
use krishi_core::geo::Coordinates;
use krishi_core::units::PricingUnit;
use krishi_core::{normalize_key, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::capacity::TimeSlot;
use crate::pricing::ConfirmedPrice;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
    Available,
    Unavailable,
    Maintenance,
}

/// Soft status: vendors are never hard-deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorStatus {
    #[default]
    Active,
    Suspended,
    Deactivated,
}

impl VendorStatus {
    /// Suspension is an operator decision: a vendor can neither lift it nor impose it.
    pub fn vendor_may_change_to(self, next: VendorStatus) -> bool {
        self != VendorStatus::Suspended && next != VendorStatus::Suspended
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorLocation {
    pub district: String,
    #[serde(default)]
    pub taluka: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// A piece of equipment or a service a vendor rents out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentOffering {
    pub equipment_id: String,
    pub name: String,
    pub category: String,
    /// Acres the vendor claims to cover in one working day
    #[serde(default)]
    pub capacity_per_day: Option<f64>,
    #[serde(default)]
    pub preferred_time_slots: BTreeSet<TimeSlot>,
    pub price_per_unit: f64,
    pub pricing_unit: PricingUnit,
    pub status: EquipmentStatus,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub tank_size_litres: Option<f64>,
}

impl EquipmentOffering {
    pub fn matches_category(&self, category: &str) -> bool {
        normalize_key(&self.category) == normalize_key(category)
    }

    pub fn is_bookable(&self) -> bool {
        self.status == EquipmentStatus::Available
    }

    /// Informational day rate for per-acre listings: capacity x price per acre.
    pub fn derived_day_price(&self) -> Option<f64> {
        match (self.pricing_unit, self.capacity_per_day) {
            (PricingUnit::PerAcre, Some(capacity)) if capacity > 0.0 => Some(capacity * self.price_per_unit),
            _ => None,
        }
    }

    /// Overwrite the listing price with a vendor-confirmed one. Returns the previous price.
    pub fn apply_price(&mut self, confirmed: &ConfirmedPrice) -> f64 {
        let previous = self.price_per_unit;
        self.price_per_unit = confirmed.price();
        self.pricing_unit = confirmed.unit();
        previous
    }

    fn validate(&self) -> CoreResult<()> {
        if self.equipment_id.trim().is_empty() {
            return Err(CoreError::ValidationError("equipment_id must not be empty".into()));
        }
        if self.name.trim().is_empty() || self.category.trim().is_empty() {
            return Err(CoreError::ValidationError(format!(
                "equipment {} needs a name and a category",
                self.equipment_id
            )));
        }
        if !self.price_per_unit.is_finite() || self.price_per_unit < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "equipment {} has an invalid price",
                self.equipment_id
            )));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(CoreError::ValidationError(format!(
                    "equipment {} rating must be between 0 and 5",
                    self.equipment_id
                )));
            }
        }
        if let Some(tank) = self.tank_size_litres {
            if !tank.is_finite() || tank < 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "equipment {} has an invalid tank size",
                    self.equipment_id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorProfile {
    pub vendor_id: String,
    pub vendor_name: String,
    pub location: VendorLocation,
    #[serde(default)]
    pub serviceable_radius_km: Option<f64>,
    #[serde(default)]
    pub status: VendorStatus,
    #[serde(default)]
    pub equipments: Vec<EquipmentOffering>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VendorProfile {
    pub fn is_active(&self) -> bool {
        self.status == VendorStatus::Active
    }

    /// Carry over what a profile edit may not change: the status, and the listing price
    /// of every offering that `stored` already has.
    pub fn keep_managed_fields(&mut self, stored: &VendorProfile) {
        self.status = stored.status;
        for offering in &mut self.equipments {
            if let Some(existing) = stored.offering(&offering.equipment_id) {
                offering.price_per_unit = existing.price_per_unit;
                offering.pricing_unit = existing.pricing_unit;
            }
        }
    }

    pub fn district_key(&self) -> String {
        normalize_key(&self.location.district)
    }

    pub fn offering(&self, equipment_id: &str) -> Option<&EquipmentOffering> {
        self.equipments.iter().find(|e| e.equipment_id == equipment_id)
    }

    pub fn offering_mut(&mut self, equipment_id: &str) -> Option<&mut EquipmentOffering> {
        self.equipments.iter_mut().find(|e| e.equipment_id == equipment_id)
    }

    pub fn offerings_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a EquipmentOffering> + 'a {
        self.equipments.iter().filter(move |e| e.matches_category(category))
    }

    /// Copy of the profile listing only offerings in `category`.
    pub fn restricted_to_category(&self, category: &str) -> VendorProfile {
        let mut copy = self.clone();
        copy.equipments.retain(|e| e.matches_category(category));
        copy
    }

    /// Structural checks for registration and edits. Capacity plausibility is checked separately.
    pub fn validate(&self) -> CoreResult<()> {
        if self.vendor_id.trim().is_empty() {
            return Err(CoreError::ValidationError("vendor_id must not be empty".into()));
        }
        if self.vendor_name.trim().is_empty() {
            return Err(CoreError::ValidationError("vendor_name must not be empty".into()));
        }
        if self.location.district.trim().is_empty() {
            return Err(CoreError::ValidationError("district must not be empty".into()));
        }
        if let Some(coords) = &self.location.coordinates {
            if !coords.is_valid() {
                return Err(CoreError::ValidationError("coordinates out of range".into()));
            }
        }
        if let Some(radius) = self.serviceable_radius_km {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(CoreError::ValidationError("serviceable_radius_km must be positive".into()));
            }
        }

        let mut seen = HashSet::new();
        for equipment in &self.equipments {
            equipment.validate()?;
            if !seen.insert(equipment.equipment_id.as_str()) {
                return Err(CoreError::ValidationError(format!(
                    "duplicate equipment_id {}",
                    equipment.equipment_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn drone(equipment_id: &str) -> EquipmentOffering {
        EquipmentOffering {
            equipment_id: equipment_id.to_string(),
            name: "Krishi Samrat Drone".to_string(),
            category: "Drone Service".to_string(),
            capacity_per_day: Some(30.0),
            preferred_time_slots: [TimeSlot::Morning, TimeSlot::Evening].into_iter().collect(),
            price_per_unit: 480.0,
            pricing_unit: PricingUnit::PerAcre,
            status: EquipmentStatus::Available,
            rating: Some(4.5),
            tank_size_litres: Some(10.0),
        }
    }

    pub fn vendor(vendor_id: &str, district: &str, equipments: Vec<EquipmentOffering>) -> VendorProfile {
        VendorProfile {
            vendor_id: vendor_id.to_string(),
            vendor_name: format!("{} Krishi Seva Kendra", vendor_id),
            location: VendorLocation {
                district: district.to_string(),
                taluka: None,
                coordinates: None,
            },
            serviceable_radius_km: None,
            status: VendorStatus::Active,
            equipments,
            updated_at: None,
        }
    }
}
