use chrono::Utc;
use krishi_core::normalize_key;
use krishi_core::identity::Actor;
use krishi_core::repository::{DocumentStore, FieldFilter, PendingLog, StoreError, StoredDocument};
use krishi_core::CoreError;
use krishi_shared::models::events::PriceConfirmedEvent;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::availability::AvailabilityCalendar;
use crate::capacity::{CapacityError, CapacityValidator};
use crate::pricing::ConfirmedPrice;
use crate::vendor::{EquipmentOffering, EquipmentStatus, VendorProfile, VendorStatus};

pub const VENDOR_COLLECTION: &str = "vendors";
pub const CALENDAR_COLLECTION: &str = "calendars";
pub const PRICING_STREAM: &str = "pricing_events";

const DISTRICT_KEY_FIELD: &str = "district_key";
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Vendor not found: {0}")]
    VendorNotFound(String),

    #[error("Equipment {equipment_id} not found for vendor {vendor_id}")]
    EquipmentNotFound {
        vendor_id: String,
        equipment_id: String,
    },

    #[error("Equipment {equipment_id}: {source}")]
    Capacity {
        equipment_id: String,
        #[source]
        source: CapacityError,
    },

    #[error("{actor} may not {action}")]
    NotPermitted {
        actor: String,
        action: String,
    },

    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Vendor profiles, their listings and their availability calendars, on top of a document store.
pub struct VendorDirectory {
    store: Arc<dyn DocumentStore>,
    capacity: CapacityValidator,
}

impl VendorDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, capacity: CapacityValidator) -> Self {
        Self { store, capacity }
    }

    /// Create or replace a vendor profile after structural and capacity checks.
    ///
    /// An edit never changes the vendor's status or the price of an offering that
    /// already exists; those go through `set_vendor_status` and `apply_confirmed_price`.
    /// New profiles start `ACTIVE`, and only new offerings take their price from the body.
    pub async fn register(&self, profile: VendorProfile) -> Result<VendorProfile, DirectoryError> {
        profile.validate()?;
        self.check_capacity(&profile)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let current = self.store.get(VENDOR_COLLECTION, &profile.vendor_id).await?;

            let mut merged = profile.clone();
            let expected = match &current {
                Some(doc) => {
                    merged.keep_managed_fields(&from_document(doc)?);
                    Some(doc.version)
                }
                None => {
                    merged.status = VendorStatus::Active;
                    None
                }
            };
            merged.updated_at = Some(Utc::now());
            let body = to_document(&merged)?;

            match self.store.put_if_match(VENDOR_COLLECTION, &merged.vendor_id, &body, expected).await {
                Ok(version) => {
                    info!(vendor_id = %merged.vendor_id, version, "Vendor profile saved");
                    return Ok(merged);
                }
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_WRITE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_vendor(&self, vendor_id: &str) -> Result<VendorProfile, DirectoryError> {
        let doc = self
            .store
            .get(VENDOR_COLLECTION, vendor_id)
            .await?
            .ok_or_else(|| DirectoryError::VendorNotFound(vendor_id.to_string()))?;
        from_document(&doc)
    }

    pub async fn get_offering(
        &self,
        vendor_id: &str,
        equipment_id: &str,
    ) -> Result<(VendorProfile, EquipmentOffering), DirectoryError> {
        let vendor = self.get_vendor(vendor_id).await?;
        let offering = vendor
            .offering(equipment_id)
            .cloned()
            .ok_or_else(|| DirectoryError::EquipmentNotFound {
                vendor_id: vendor_id.to_string(),
                equipment_id: equipment_id.to_string(),
            })?;
        Ok((vendor, offering))
    }

    /// Active vendors, narrowed by district in the store and by category after loading.
    /// With a category, each profile only lists offerings in that category.
    pub async fn find_candidates(
        &self,
        district: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<VendorProfile>, DirectoryError> {
        let filters: Vec<FieldFilter> = district
            .map(|d| vec![FieldFilter::eq(DISTRICT_KEY_FIELD, normalize_key(d))])
            .unwrap_or_default();

        let docs = self.store.query(VENDOR_COLLECTION, &filters).await?;
        let mut vendors = Vec::with_capacity(docs.len());
        for doc in &docs {
            let vendor = from_document(doc)?;
            if !vendor.is_active() {
                continue;
            }
            match category {
                Some(c) => {
                    let narrowed = vendor.restricted_to_category(c);
                    if !narrowed.equipments.is_empty() {
                        vendors.push(narrowed);
                    }
                }
                None => vendors.push(vendor),
            }
        }
        Ok(vendors)
    }

    /// Operators may set any status. A vendor may deactivate or reactivate itself,
    /// but never enter or leave `SUSPENDED`.
    pub async fn set_vendor_status(
        &self,
        vendor_id: &str,
        status: VendorStatus,
        changed_by: &Actor,
    ) -> Result<VendorProfile, DirectoryError> {
        let updated = self
            .update_vendor(vendor_id, |vendor| {
                let allowed = changed_by.is_operator()
                    || (changed_by.is_vendor(vendor_id) && vendor.status.vendor_may_change_to(status));
                if !allowed {
                    return Err(DirectoryError::NotPermitted {
                        actor: changed_by.role.as_str().to_string(),
                        action: format!("change vendor status from {:?} to {:?}", vendor.status, status),
                    });
                }
                vendor.status = status;
                Ok(None)
            })
            .await?;
        info!(vendor_id, ?status, actor = changed_by.role.as_str(), "Vendor status changed");
        Ok(updated)
    }

    pub async fn set_offering_status(
        &self,
        vendor_id: &str,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> Result<EquipmentOffering, DirectoryError> {
        let updated = self
            .update_vendor(vendor_id, |vendor| {
                let offering = offering_in(vendor, equipment_id)?;
                offering.status = status;
                Ok(None)
            })
            .await?;
        info!(vendor_id, equipment_id, ?status, "Equipment status changed");
        offering_of(&updated, equipment_id)
    }

    /// Persist a price the vendor explicitly confirmed. The pricing-stream record is
    /// written in the same store operation as the new price.
    pub async fn apply_confirmed_price(
        &self,
        vendor_id: &str,
        equipment_id: &str,
        confirmed: &ConfirmedPrice,
    ) -> Result<EquipmentOffering, DirectoryError> {
        let key = format!("{}/{}", vendor_id, equipment_id);
        let updated = self
            .update_vendor(vendor_id, |vendor| {
                let offering = offering_in(vendor, equipment_id)?;
                let previous_price = offering.apply_price(confirmed);
                let event = PriceConfirmedEvent {
                    vendor_id: vendor_id.to_string(),
                    equipment_id: equipment_id.to_string(),
                    previous_price,
                    confirmed_price: confirmed.price(),
                    pricing_unit: confirmed.unit().label().to_string(),
                    suggested_price: confirmed.suggested_price(),
                    recorded_at: Utc::now(),
                };
                let body = serde_json::to_value(&event).map_err(StoreError::from)?;
                Ok(Some(PendingLog::new(PRICING_STREAM, key.clone(), body)))
            })
            .await?;

        info!(vendor_id, equipment_id, price = confirmed.price(), "Listing price confirmed");
        offering_of(&updated, equipment_id)
    }

    /// Stored calendar, or the default week when the vendor has never edited one.
    pub async fn load_calendar(&self, vendor_id: &str) -> Result<AvailabilityCalendar, DirectoryError> {
        match self.store.get(CALENDAR_COLLECTION, vendor_id).await? {
            Some(doc) => Ok(serde_json::from_value(doc.body).map_err(StoreError::from)?),
            None => Ok(AvailabilityCalendar::new(vendor_id)),
        }
    }

    /// Last writer wins: the stored version is re-read and overwritten on conflict.
    pub async fn save_calendar(&self, calendar: &AvailabilityCalendar) -> Result<(), DirectoryError> {
        let body = serde_json::to_value(calendar).map_err(StoreError::from)?;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let expected = self
                .store
                .get(CALENDAR_COLLECTION, &calendar.vendor_id)
                .await?
                .map(|doc| doc.version);

            match self.store.put_if_match(CALENDAR_COLLECTION, &calendar.vendor_id, &body, expected).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_WRITE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn check_capacity(&self, profile: &VendorProfile) -> Result<(), DirectoryError> {
        for offering in &profile.equipments {
            let claimed = offering.capacity_per_day.unwrap_or(0.0);
            self.capacity
                .validate(claimed, &offering.category, &offering.preferred_time_slots)
                .map_err(|source| DirectoryError::Capacity {
                    equipment_id: offering.equipment_id.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Read-modify-write with compare-and-swap on the vendor document.
    /// A log record returned by `mutate` is stored atomically with the new profile.
    async fn update_vendor<F>(&self, vendor_id: &str, mut mutate: F) -> Result<VendorProfile, DirectoryError>
    where
        F: FnMut(&mut VendorProfile) -> Result<Option<PendingLog>, DirectoryError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let doc = self
                .store
                .get(VENDOR_COLLECTION, vendor_id)
                .await?
                .ok_or_else(|| DirectoryError::VendorNotFound(vendor_id.to_string()))?;

            let mut vendor = from_document(&doc)?;
            let log = mutate(&mut vendor)?;
            vendor.updated_at = Some(Utc::now());

            let body = to_document(&vendor)?;
            let written = match &log {
                Some(log) => {
                    self.store
                        .put_if_match_with_log(VENDOR_COLLECTION, vendor_id, &body, Some(doc.version), log)
                        .await
                }
                None => self.store.put_if_match(VENDOR_COLLECTION, vendor_id, &body, Some(doc.version)).await,
            };
            match written {
                Ok(_) => return Ok(vendor),
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_WRITE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn offering_in<'a>(vendor: &'a mut VendorProfile, equipment_id: &str) -> Result<&'a mut EquipmentOffering, DirectoryError> {
    let vendor_id = vendor.vendor_id.clone();
    vendor
        .offering_mut(equipment_id)
        .ok_or_else(|| DirectoryError::EquipmentNotFound {
            vendor_id,
            equipment_id: equipment_id.to_string(),
        })
}

fn offering_of(vendor: &VendorProfile, equipment_id: &str) -> Result<EquipmentOffering, DirectoryError> {
    vendor
        .offering(equipment_id)
        .cloned()
        .ok_or_else(|| DirectoryError::EquipmentNotFound {
            vendor_id: vendor.vendor_id.clone(),
            equipment_id: equipment_id.to_string(),
        })
}

fn to_document(profile: &VendorProfile) -> Result<Value, DirectoryError> {
    let mut body = serde_json::to_value(profile).map_err(StoreError::from)?;
    if let Value::Object(map) = &mut body {
        map.insert(DISTRICT_KEY_FIELD.to_string(), Value::String(profile.district_key()));
    }
    Ok(body)
}

fn from_document(doc: &StoredDocument) -> Result<VendorProfile, DirectoryError> {
    Ok(serde_json::from_value(doc.body.clone()).map_err(StoreError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::TimeSlot;
    use crate::vendor::fixtures::{drone, vendor};
    use krishi_core::memory::MemoryDocumentStore;
    use krishi_core::units::PricingUnit;

    fn directory() -> (Arc<MemoryDocumentStore>, VendorDirectory) {
        let store = Arc::new(MemoryDocumentStore::new());
        let dir = VendorDirectory::new(store.clone(), CapacityValidator::default());
        (store, dir)
    }

    fn tractor(equipment_id: &str) -> EquipmentOffering {
        let mut t = drone(equipment_id);
        t.name = "Mahindra Tractor 575".to_string();
        t.category = "Tractor".to_string();
        t.capacity_per_day = None;
        t.pricing_unit = PricingUnit::PerHour;
        t.price_per_unit = 600.0;
        t
    }

    #[tokio::test]
    async fn test_register_and_find_by_district_and_category() {
        let (_, dir) = directory();
        dir.register(vendor("vendor_a", "Pune", vec![drone("eq1"), tractor("eq2")])).await.unwrap();
        dir.register(vendor("vendor_b", "Satara", vec![tractor("eq3")])).await.unwrap();

        let pune = dir.find_candidates(Some("  pune "), None).await.unwrap();
        assert_eq!(pune.len(), 1);
        assert_eq!(pune[0].equipments.len(), 2);

        let tractors = dir.find_candidates(None, Some("tractor")).await.unwrap();
        let ids: Vec<_> = tractors.iter().map(|v| v.vendor_id.as_str()).collect();
        assert_eq!(ids, vec!["vendor_a", "vendor_b"]);
        assert!(tractors.iter().all(|v| v.equipments.iter().all(|e| e.category == "Tractor")));

        assert!(dir.find_candidates(Some("Satara"), Some("Drone Service")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_implausible_drone_capacity() {
        let (_, dir) = directory();
        let mut d = drone("eq1");
        d.capacity_per_day = Some(50.0);
        d.preferred_time_slots = [TimeSlot::Morning].into_iter().collect();

        let err = dir.register(vendor("vendor_a", "Pune", vec![d])).await.unwrap_err();
        match err {
            DirectoryError::Capacity { equipment_id, source } => {
                assert_eq!(equipment_id, "eq1");
                assert_eq!(source, CapacityError::CapacityExceeded { max_allowed: 15.0, claimed: 50.0 });
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_drone_without_slots_requires_time_selection() {
        let (_, dir) = directory();
        let mut d = drone("eq1");
        d.preferred_time_slots.clear();
        let err = dir.register(vendor("vendor_a", "Pune", vec![d])).await.unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Capacity { source: CapacityError::TimeSelectionRequired { .. }, .. }
        ));
    }

    #[tokio::test]
    async fn test_soft_status_hides_vendor_from_candidates() {
        let (_, dir) = directory();
        dir.register(vendor("vendor_b", "Satara", vec![tractor("eq3")])).await.unwrap();
        dir.set_vendor_status("vendor_b", VendorStatus::Suspended, &Actor::operator("ops_1")).await.unwrap();

        assert!(dir.find_candidates(Some("Satara"), None).await.unwrap().is_empty());
        // Still retrievable directly
        assert_eq!(dir.get_vendor("vendor_b").await.unwrap().status, VendorStatus::Suspended);
    }

    #[tokio::test]
    async fn test_profile_edit_cannot_reprice_or_reactivate() {
        let (store, dir) = directory();
        dir.register(vendor("vendor_a", "Pune", vec![drone("eq1")])).await.unwrap();
        dir.set_vendor_status("vendor_a", VendorStatus::Suspended, &Actor::operator("ops_1"))
            .await
            .unwrap();

        let mut cheap = drone("eq1");
        cheap.price_per_unit = 1.0;
        let mut edit = vendor("vendor_a", "Pune", vec![cheap]);
        edit.status = VendorStatus::Active;
        let saved = dir.register(edit).await.unwrap();

        assert_eq!(saved.status, VendorStatus::Suspended);
        let stored = dir.get_vendor("vendor_a").await.unwrap();
        assert_eq!(stored.status, VendorStatus::Suspended);
        assert_eq!(stored.equipments[0].price_per_unit, 480.0);
        assert!(store.read_stream(PRICING_STREAM, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_profile_starts_active() {
        let (_, dir) = directory();
        let mut profile = vendor("vendor_a", "Pune", vec![drone("eq1")]);
        profile.status = VendorStatus::Suspended;
        assert_eq!(dir.register(profile).await.unwrap().status, VendorStatus::Active);
    }

    #[tokio::test]
    async fn test_only_operators_lift_a_suspension() {
        let (_, dir) = directory();
        let own = Actor::vendor("vendor_a");
        dir.register(vendor("vendor_a", "Pune", vec![drone("eq1")])).await.unwrap();

        // Self-service deactivation round trip
        dir.set_vendor_status("vendor_a", VendorStatus::Deactivated, &own).await.unwrap();
        dir.set_vendor_status("vendor_a", VendorStatus::Active, &own).await.unwrap();

        assert!(matches!(
            dir.set_vendor_status("vendor_a", VendorStatus::Suspended, &own).await,
            Err(DirectoryError::NotPermitted { .. })
        ));

        let ops = Actor::operator("ops_1");
        dir.set_vendor_status("vendor_a", VendorStatus::Suspended, &ops).await.unwrap();
        assert!(matches!(
            dir.set_vendor_status("vendor_a", VendorStatus::Active, &own).await,
            Err(DirectoryError::NotPermitted { .. })
        ));
        assert!(matches!(
            dir.set_vendor_status("vendor_a", VendorStatus::Active, &Actor::vendor("vendor_b")).await,
            Err(DirectoryError::NotPermitted { .. })
        ));

        dir.set_vendor_status("vendor_a", VendorStatus::Active, &ops).await.unwrap();
        assert_eq!(dir.get_vendor("vendor_a").await.unwrap().status, VendorStatus::Active);
    }

    #[tokio::test]
    async fn test_offering_lookup_and_status() {
        let (_, dir) = directory();
        dir.register(vendor("vendor_b", "Satara", vec![tractor("eq3")])).await.unwrap();

        let updated = dir.set_offering_status("vendor_b", "eq3", EquipmentStatus::Maintenance).await.unwrap();
        assert_eq!(updated.status, EquipmentStatus::Maintenance);

        assert!(matches!(
            dir.get_offering("vendor_b", "missing").await,
            Err(DirectoryError::EquipmentNotFound { .. })
        ));
        assert!(matches!(dir.get_vendor("nobody").await, Err(DirectoryError::VendorNotFound(_))));
    }

    #[tokio::test]
    async fn test_confirmed_price_is_applied_and_recorded() {
        let (store, dir) = directory();
        dir.register(vendor("vendor_b", "Satara", vec![tractor("eq3")])).await.unwrap();

        let confirmed = ConfirmedPrice::manual(650.0, PricingUnit::PerHour, Some(700.0)).unwrap();
        let offering = dir.apply_confirmed_price("vendor_b", "eq3", &confirmed).await.unwrap();
        assert_eq!(offering.price_per_unit, 650.0);

        let events = store.read_stream(PRICING_STREAM, Some("vendor_b/eq3")).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].body["previous_price"], 600.0);
        assert_eq!(events[0].body["suggested_price"], 700.0);
    }

    #[tokio::test]
    async fn test_calendar_defaults_and_persists() {
        let (_, dir) = directory();
        let mut cal = dir.load_calendar("vendor_a").await.unwrap();
        assert_eq!(cal, AvailabilityCalendar::new("vendor_a"));

        let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        cal.toggle_blocked(day);
        dir.save_calendar(&cal).await.unwrap();
        dir.save_calendar(&cal).await.unwrap();

        assert!(dir.load_calendar("vendor_a").await.unwrap().is_blocked(day));
    }
}
