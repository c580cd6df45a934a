use krishi_catalog::capacity::CapacityValidator;
use krishi_catalog::vendor::{EquipmentOffering, VendorProfile};
use krishi_core::CoreResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::geo::{GeoFilter, Proximity};
use crate::models::{MatchResult, ScoreBreakdown, SuggestedEquipment};
use crate::request::FarmerRequest;

/// Sub-score weights. Loaded from the `matching` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchWeights {
    #[serde(default = "default_category_weight")]
    pub category: f64,
    #[serde(default = "default_proximity_weight")]
    pub proximity: f64,
    #[serde(default = "default_capacity_weight")]
    pub capacity: f64,
}

fn default_category_weight() -> f64 { 0.5 }
fn default_proximity_weight() -> f64 { 0.3 }
fn default_capacity_weight() -> f64 { 0.2 }

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            category: default_category_weight(),
            proximity: default_proximity_weight(),
            capacity: default_capacity_weight(),
        }
    }
}

impl MatchWeights {
    fn total(&self) -> f64 {
        self.category + self.proximity + self.capacity
    }
}

/// Ranks candidate vendors against a farmer request
pub struct MatchScorer {
    weights: MatchWeights,
    geo: GeoFilter,
    capacity: CapacityValidator,
}

impl MatchScorer {
    pub fn new(weights: MatchWeights, capacity: CapacityValidator) -> Self {
        Self {
            weights,
            geo: GeoFilter::new(),
            capacity,
        }
    }

    /// Score every candidate in parallel, drop those without a fitting offering,
    /// and order by score (desc) then vendor id (asc).
    pub fn match_vendors(&self, request: &FarmerRequest, vendors: &[VendorProfile]) -> CoreResult<Vec<MatchResult>> {
        request.validate()?;

        let mut results: Vec<MatchResult> = vendors
            .par_iter()
            .filter_map(|vendor| self.score_vendor(request, vendor))
            .collect();

        results.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.vendor_id.cmp(&b.vendor_id))
        });

        tracing::debug!(
            candidates = vendors.len(),
            matched = results.len(),
            service = %request.service_needed,
            "Vendor matching complete"
        );

        Ok(results)
    }

    /// `None` when the vendor is inactive or offers nothing bookable in the requested category.
    pub fn score_vendor(&self, request: &FarmerRequest, vendor: &VendorProfile) -> Option<MatchResult> {
        if !vendor.is_active() {
            return None;
        }

        let matching: Vec<&EquipmentOffering> = vendor
            .offerings_in_category(&request.service_needed)
            .filter(|e| e.is_bookable())
            .collect();
        if matching.is_empty() {
            return None;
        }
        let category_fit = 1.0;

        let proximity = self.geo.proximity(vendor, request);
        let proximity_fit = proximity.fit();

        let suggested: Vec<SuggestedEquipment> = matching
            .iter()
            .map(|offering| SuggestedEquipment {
                equipment_id: offering.equipment_id.clone(),
                name: offering.name.clone(),
                category: offering.category.clone(),
                price_per_unit: offering.price_per_unit,
                pricing_unit: offering.pricing_unit,
                capacity_per_day: offering.capacity_per_day,
                plausible_capacity: self.plausible_capacity(offering),
            })
            .collect();

        let capacity_fit = suggested
            .iter()
            .map(|e| capacity_fit(request.land_size_acres, e.plausible_capacity))
            .fold(0.0, f64::max);

        let match_score = self.combine(category_fit, proximity_fit, capacity_fit);
        let breakdown = ScoreBreakdown {
            category_fit,
            proximity_fit,
            capacity_fit,
            proximity,
        };
        let reasoning = explain(request, vendor, &suggested, &breakdown);

        tracing::debug!(vendor_id = %vendor.vendor_id, match_score, ?breakdown, "Scored vendor");

        Some(MatchResult {
            vendor_id: vendor.vendor_id.clone(),
            vendor_name: vendor.vendor_name.clone(),
            match_score,
            breakdown,
            suggested_equipment: suggested,
            reasoning,
        })
    }

    /// Smaller of the vendor's claim and the physical ceiling for its working hours.
    /// `None` when neither is known.
    pub fn plausible_capacity(&self, offering: &EquipmentOffering) -> Option<f64> {
        let claim = offering.capacity_per_day.filter(|c| *c > 0.0);
        let ceiling = self
            .capacity
            .max_plausible_capacity(&offering.category, &offering.preferred_time_slots)
            .filter(|c| *c > 0.0);

        match (claim, ceiling) {
            (Some(claim), Some(ceiling)) => Some(claim.min(ceiling)),
            (claim, ceiling) => claim.or(ceiling),
        }
    }

    fn combine(&self, category_fit: f64, proximity_fit: f64, capacity_fit: f64) -> f64 {
        let total = self.weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = category_fit * self.weights.category
            + proximity_fit * self.weights.proximity
            + capacity_fit * self.weights.capacity;

        let score = (weighted / total).clamp(0.0, 1.0);
        (score * 10_000.0).round() / 10_000.0
    }
}

/// 1.0 up to the daily capacity, falling linearly to 0.0 at three times it.
fn capacity_fit(land_size_acres: f64, capacity: Option<f64>) -> f64 {
    match capacity {
        None => 1.0,
        Some(c) if land_size_acres <= c => 1.0,
        Some(c) if land_size_acres >= 3.0 * c => 0.0,
        Some(c) => 1.0 - (land_size_acres - c) / (2.0 * c),
    }
}

fn explain(
    request: &FarmerRequest,
    vendor: &VendorProfile,
    suggested: &[SuggestedEquipment],
    breakdown: &ScoreBreakdown,
) -> String {
    let names: Vec<&str> = suggested.iter().map(|e| e.name.as_str()).collect();
    let mut parts = vec![format!(
        "Offers {} ({}) for {} on {} soil",
        request.service_needed,
        names.join(", "),
        request.crop_type,
        request.soil_type
    )];

    parts.push(match breakdown.proximity {
        Proximity::TalukaMatch => format!(
            "Based in {}, {}",
            vendor.location.taluka.as_deref().unwrap_or_default(),
            vendor.location.district
        ),
        Proximity::DistrictMatch => format!("Serves {} district", vendor.location.district),
        Proximity::OutOfArea => "Outside the vendor's service area".to_string(),
    });

    let best_capacity = suggested
        .iter()
        .filter_map(|e| e.plausible_capacity)
        .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))));
    parts.push(match best_capacity {
        None => "Daily capacity not declared".to_string(),
        Some(c) if breakdown.capacity_fit >= 1.0 => {
            format!("{} acres fits within one day's capacity of {} acres", request.land_size_acres, c)
        }
        Some(c) => format!(
            "{} acres exceeds the {} acre daily capacity, expect more than one day",
            request.land_size_acres, c
        ),
    });

    parts.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_catalog::capacity::TimeSlot;
    use krishi_catalog::vendor::{EquipmentStatus, VendorLocation, VendorStatus};
    use krishi_core::units::PricingUnit;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn offering(id: &str, category: &str, capacity: Option<f64>) -> EquipmentOffering {
        EquipmentOffering {
            equipment_id: id.to_string(),
            name: format!("{} unit", category),
            category: category.to_string(),
            capacity_per_day: capacity,
            preferred_time_slots: BTreeSet::new(),
            price_per_unit: 480.0,
            pricing_unit: PricingUnit::PerAcre,
            status: EquipmentStatus::Available,
            rating: None,
            tank_size_litres: None,
        }
    }

    fn vendor(id: &str, district: &str, taluka: Option<&str>, equipments: Vec<EquipmentOffering>) -> VendorProfile {
        VendorProfile {
            vendor_id: id.to_string(),
            vendor_name: format!("Vendor {}", id),
            location: VendorLocation {
                district: district.to_string(),
                taluka: taluka.map(str::to_string),
                coordinates: None,
            },
            serviceable_radius_km: None,
            status: VendorStatus::Active,
            equipments,
            updated_at: None,
        }
    }

    fn request(land: f64) -> FarmerRequest {
        FarmerRequest {
            soil_type: "Black".to_string(),
            crop_type: "Sugarcane".to_string(),
            district: "Pune".to_string(),
            taluka: None,
            land_size_acres: land,
            service_needed: "Drone Service".to_string(),
            coordinates: None,
        }
    }

    fn scorer() -> MatchScorer {
        MatchScorer::new(MatchWeights::default(), CapacityValidator::default())
    }

    #[test]
    fn test_drone_request_matches_only_offering_vendor() {
        let vendors = vec![
            vendor("vendor_a", "Pune", None, vec![offering("eq1", "Drone Service", Some(100.0))]),
            vendor("vendor_b", "Satara", None, vec![offering("eq2", "Tractor", None)]),
        ];

        let results = scorer().match_vendors(&request(8.0), &vendors).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].vendor_id, "vendor_a");
        assert!(results[0].match_score > 0.0);
        // 0.5 category + 0.3 * 0.7 district-only + 0.2 capacity
        assert!((results[0].match_score - 0.91).abs() < 1e-9);
        assert_eq!(results[0].equipment_ids(), vec!["eq1"]);
    }

    #[test]
    fn test_only_matching_offerings_are_suggested() {
        let vendors = vec![vendor(
            "vendor_a",
            "Pune",
            None,
            vec![
                offering("eq1", "Drone Service", Some(20.0)),
                offering("eq2", "Tractor", None),
                offering("eq3", "drone service", None),
            ],
        )];

        let results = scorer().match_vendors(&request(8.0), &vendors).unwrap();
        assert_eq!(results[0].equipment_ids(), vec!["eq1", "eq3"]);
    }

    #[test]
    fn test_unbookable_offerings_do_not_count() {
        let mut maintenance = offering("eq1", "Drone Service", Some(20.0));
        maintenance.status = EquipmentStatus::Maintenance;
        let vendors = vec![vendor("vendor_a", "Pune", None, vec![maintenance])];

        assert!(scorer().match_vendors(&request(8.0), &vendors).unwrap().is_empty());
    }

    #[test]
    fn test_inactive_vendors_are_excluded() {
        let mut v = vendor("vendor_a", "Pune", None, vec![offering("eq1", "Drone Service", None)]);
        v.status = VendorStatus::Deactivated;
        assert!(scorer().match_vendors(&request(8.0), &[v]).unwrap().is_empty());
    }

    #[test]
    fn test_taluka_match_outranks_district_match() {
        let mut req = request(8.0);
        req.taluka = Some("Haveli".to_string());

        let vendors = vec![
            vendor("vendor_a", "Pune", Some("Mulshi"), vec![offering("eq1", "Drone Service", None)]),
            vendor("vendor_b", "Pune", Some("Haveli"), vec![offering("eq2", "Drone Service", None)]),
        ];

        let results = scorer().match_vendors(&req, &vendors).unwrap();
        assert_eq!(results[0].vendor_id, "vendor_b");
        assert_eq!(results[0].breakdown.proximity, Proximity::TalukaMatch);
        assert!((results[0].match_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_area_vendor_still_listed_with_lower_score() {
        let vendors = vec![vendor("vendor_x", "Satara", None, vec![offering("eq1", "Drone Service", None)])];
        let results = scorer().match_vendors(&request(8.0), &vendors).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].breakdown.proximity_fit, 0.0);
        assert!((results[0].match_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_ties_broken_by_vendor_id() {
        let vendors = vec![
            vendor("vendor_c", "Pune", None, vec![offering("eq1", "Drone Service", None)]),
            vendor("vendor_a", "Pune", None, vec![offering("eq2", "Drone Service", None)]),
            vendor("vendor_b", "Pune", None, vec![offering("eq3", "Drone Service", None)]),
        ];
        let results = scorer().match_vendors(&request(8.0), &vendors).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.vendor_id.as_str()).collect();
        assert_eq!(ids, vec!["vendor_a", "vendor_b", "vendor_c"]);
    }

    #[test]
    fn test_capacity_fit_decay() {
        assert_eq!(capacity_fit(10.0, None), 1.0);
        assert_eq!(capacity_fit(10.0, Some(10.0)), 1.0);
        assert!((capacity_fit(20.0, Some(10.0)) - 0.5).abs() < 1e-9);
        assert_eq!(capacity_fit(30.0, Some(10.0)), 0.0);
        assert_eq!(capacity_fit(45.0, Some(10.0)), 0.0);
    }

    #[test]
    fn test_plausible_capacity_uses_physical_ceiling() {
        let s = scorer();
        let mut drone = offering("eq1", "Spraying Drone", Some(100.0));
        // No working hours: only the claim is known
        assert_eq!(s.plausible_capacity(&drone), Some(100.0));

        drone.preferred_time_slots = [TimeSlot::Morning].into_iter().collect();
        assert_eq!(s.plausible_capacity(&drone), Some(15.0));

        drone.capacity_per_day = None;
        assert_eq!(s.plausible_capacity(&drone), Some(15.0));

        let tractor = offering("eq2", "Tractor", None);
        assert_eq!(s.plausible_capacity(&tractor), None);
    }

    #[test]
    fn test_large_plot_lowers_score() {
        let mut drone = offering("eq1", "Drone Service", Some(30.0));
        drone.preferred_time_slots = [TimeSlot::Morning, TimeSlot::Evening].into_iter().collect();
        let vendors = vec![vendor("vendor_a", "Pune", None, vec![drone])];

        let results = scorer().match_vendors(&request(60.0), &vendors).unwrap();
        assert!((results[0].breakdown.capacity_fit - 0.5).abs() < 1e-9);
        assert!(results[0].reasoning.contains("more than one day"));
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        assert!(scorer().match_vendors(&request(-1.0), &[]).is_err());
        assert!(scorer().match_vendors(&request(5.0), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_custom_weights() {
        let weights = MatchWeights { category: 1.0, proximity: 0.0, capacity: 0.0 };
        let s = MatchScorer::new(weights, CapacityValidator::default());
        let vendors = vec![vendor("vendor_x", "Satara", None, vec![offering("eq1", "Drone Service", None)])];
        let results = s.match_vendors(&request(8.0), &vendors).unwrap();
        assert_eq!(results[0].match_score, 1.0);
    }

    fn arb_vendor() -> impl Strategy<Value = VendorProfile> {
        (
            0u32..1000,
            prop::sample::select(vec!["Pune", "Satara", "Nashik"]),
            prop::sample::select(vec!["Drone Service", "Tractor", "Harvester"]),
            prop::option::of(1.0f64..200.0),
        )
            .prop_map(|(n, district, category, capacity)| {
                vendor(
                    &format!("vendor_{:02}", n),
                    district,
                    None,
                    vec![offering(&format!("eq_{}", n), category, capacity)],
                )
            })
    }

    proptest! {
        #[test]
        fn results_are_sorted_deterministic_and_category_filtered(
            vendors in prop::collection::vec(arb_vendor(), 0..40),
            land in 1.0f64..300.0,
        ) {
            let vendors: Vec<VendorProfile> = vendors
                .into_iter()
                .enumerate()
                .map(|(i, mut v)| {
                    v.vendor_id = format!("vendor_{:02}", i);
                    v
                })
                .collect();
            let s = scorer();
            let req = request(land);
            let first = s.match_vendors(&req, &vendors).unwrap();
            let second = s.match_vendors(&req, &vendors).unwrap();
            prop_assert_eq!(&first, &second);

            for pair in first.windows(2) {
                prop_assert!(
                    pair[0].match_score > pair[1].match_score
                        || (pair[0].match_score == pair[1].match_score && pair[0].vendor_id <= pair[1].vendor_id)
                );
            }

            for result in &first {
                prop_assert!((0.0..=1.0).contains(&result.match_score));
                let source = vendors.iter().find(|v| v.vendor_id == result.vendor_id).unwrap();
                prop_assert!(source.equipments.iter().any(|e| e.matches_category("Drone Service")));
            }

            let drone_vendors = vendors
                .iter()
                .filter(|v| v.equipments.iter().any(|e| e.matches_category("Drone Service")))
                .count();
            prop_assert_eq!(first.len(), drone_vendors);
        }
    }
}
