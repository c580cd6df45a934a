use krishi_core::units::PricingUnit;
use serde::Serialize;

use crate::geo::Proximity;

/// Offering carried into a match because its category fits the request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuggestedEquipment {
    pub equipment_id: String,
    pub name: String,
    pub category: String,
    pub price_per_unit: f64,
    pub pricing_unit: PricingUnit,
    pub capacity_per_day: Option<f64>,
    /// Acres per day used for capacity fit, after the physical ceiling is applied.
    pub plausible_capacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub category_fit: f64,
    pub proximity_fit: f64,
    pub capacity_fit: f64,
    pub proximity: Proximity,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchResult {
    pub vendor_id: String,
    pub vendor_name: String,
    /// In [0, 1]
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
    pub suggested_equipment: Vec<SuggestedEquipment>,
    pub reasoning: String,
}

impl MatchResult {
    pub fn equipment_ids(&self) -> Vec<&str> {
        self.suggested_equipment.iter().map(|e| e.equipment_id.as_str()).collect()
    }
}
