use krishi_catalog::vendor::VendorProfile;
use krishi_core::normalize_key;
use serde::Serialize;

use crate::request::FarmerRequest;

/// How close a vendor's service area is to the farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Proximity {
    TalukaMatch,
    DistrictMatch,
    OutOfArea,
}

impl Proximity {
    pub fn fit(&self) -> f64 {
        match self {
            Proximity::TalukaMatch => 1.0,
            Proximity::DistrictMatch => 0.7,
            Proximity::OutOfArea => 0.0,
        }
    }
}

/// Service-area coverage checks. Pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoFilter;

impl GeoFilter {
    pub fn new() -> Self {
        Self
    }

    /// Same district, and within the vendor's radius when both sides have coordinates.
    pub fn is_serviceable(&self, vendor: &VendorProfile, request: &FarmerRequest) -> bool {
        if normalize_key(&vendor.location.district) != normalize_key(&request.district) {
            return false;
        }

        match (vendor.serviceable_radius_km, vendor.location.coordinates, request.coordinates) {
            (Some(radius), Some(base), Some(farm)) => base.distance_km(&farm) <= radius,
            _ => true,
        }
    }

    pub fn proximity(&self, vendor: &VendorProfile, request: &FarmerRequest) -> Proximity {
        if !self.is_serviceable(vendor, request) {
            return Proximity::OutOfArea;
        }

        match (&vendor.location.taluka, &request.taluka) {
            (Some(a), Some(b)) if normalize_key(a) == normalize_key(b) => Proximity::TalukaMatch,
            _ => Proximity::DistrictMatch,
        }
    }
}
