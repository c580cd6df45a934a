use krishi_core::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Working-time window a vendor offers for a piece of equipment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeSlot {
    Morning,
    Evening,
    AnyTime,
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeSlot::Morning => "Morning",
            TimeSlot::Evening => "Evening",
            TimeSlot::AnyTime => "Any Time",
        };
        f.write_str(label)
    }
}

/// Per-hour ceiling for categories whose name contains `keyword`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryThroughput {
    pub keyword: String,
    pub acres_per_hour: f64,
}

/// Capacity constants. These are marketplace policy and are loaded from config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityPolicy {
    #[serde(default = "default_slot_hours")]
    pub morning_hours: f64,
    #[serde(default = "default_slot_hours")]
    pub evening_hours: f64,
    #[serde(default = "default_any_time_hours")]
    pub any_time_hours: f64,
    #[serde(default = "default_throughputs")]
    pub throughputs: Vec<CategoryThroughput>,
}

fn default_slot_hours() -> f64 { 3.0 }
fn default_any_time_hours() -> f64 { 6.0 }
fn default_throughputs() -> Vec<CategoryThroughput> {
    vec![CategoryThroughput { keyword: "drone".to_string(), acres_per_hour: 5.0 }]
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            morning_hours: default_slot_hours(),
            evening_hours: default_slot_hours(),
            any_time_hours: default_any_time_hours(),
            throughputs: default_throughputs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapacityError {
    #[error("Capacity exceeded: at most {max_allowed} acres per day for the selected hours (claimed {claimed})")]
    CapacityExceeded {
        max_allowed: f64,
        claimed: f64,
    },

    #[error("Select working hours before declaring a per-day capacity for {category}")]
    TimeSelectionRequired {
        category: String,
    },

    #[error("Invalid capacity claim: {0}")]
    InvalidClaim(f64),
}

/// Decides whether a per-day acreage claim is physically plausible.
#[derive(Debug, Clone, Default)]
pub struct CapacityValidator {
    policy: CapacityPolicy,
}

impl CapacityValidator {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    /// Acres per hour for a capacity-checked category, `None` if the category has no ceiling.
    pub fn throughput_for(&self, category: &str) -> Option<f64> {
        let category = normalize_key(category);
        self.policy
            .throughputs
            .iter()
            .find(|t| category.contains(&normalize_key(&t.keyword)))
            .map(|t| t.acres_per_hour)
    }

    /// Hours of work the slots add up to. AnyTime only counts when it is the sole selection.
    pub fn working_hours(&self, slots: &BTreeSet<TimeSlot>) -> f64 {
        let mut hours = 0.0;
        if slots.contains(&TimeSlot::Morning) {
            hours += self.policy.morning_hours;
        }
        if slots.contains(&TimeSlot::Evening) {
            hours += self.policy.evening_hours;
        }
        if slots.contains(&TimeSlot::AnyTime) && hours == 0.0 {
            hours += self.policy.any_time_hours;
        }
        hours
    }

    /// Ceiling in acres per day, or `None` when the category is not capacity-checked.
    pub fn max_plausible_capacity(&self, category: &str, slots: &BTreeSet<TimeSlot>) -> Option<f64> {
        self.throughput_for(category)
            .map(|rate| rate * self.working_hours(slots))
    }

    pub fn validate(
        &self,
        claimed_acres_per_day: f64,
        category: &str,
        slots: &BTreeSet<TimeSlot>,
    ) -> Result<(), CapacityError> {
        if !claimed_acres_per_day.is_finite() || claimed_acres_per_day < 0.0 {
            return Err(CapacityError::InvalidClaim(claimed_acres_per_day));
        }

        // Nothing claimed yet
        if claimed_acres_per_day == 0.0 {
            return Ok(());
        }

        let Some(rate) = self.throughput_for(category) else {
            return Ok(());
        };

        if slots.is_empty() {
            return Err(CapacityError::TimeSelectionRequired {
                category: category.to_string(),
            });
        }

        let max_allowed = rate * self.working_hours(slots);
        if claimed_acres_per_day > max_allowed {
            return Err(CapacityError::CapacityExceeded {
                max_allowed,
                claimed: claimed_acres_per_day,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(items: &[TimeSlot]) -> BTreeSet<TimeSlot> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_slot_combinations() {
        let v = CapacityValidator::default();
        let drone = "Spraying Drone";

        assert_eq!(v.max_plausible_capacity(drone, &slots(&[TimeSlot::Morning, TimeSlot::Evening])), Some(30.0));
        assert_eq!(v.max_plausible_capacity(drone, &slots(&[TimeSlot::AnyTime])), Some(30.0));
        assert_eq!(v.max_plausible_capacity(drone, &slots(&[TimeSlot::Morning, TimeSlot::AnyTime])), Some(15.0));
        assert_eq!(v.max_plausible_capacity(drone, &slots(&[TimeSlot::Evening])), Some(15.0));
        assert_eq!(
            v.max_plausible_capacity(drone, &slots(&[TimeSlot::Morning, TimeSlot::Evening, TimeSlot::AnyTime])),
            Some(30.0)
        );
    }

    #[test]
    fn test_unrated_category_is_not_checked() {
        let v = CapacityValidator::default();
        assert_eq!(v.max_plausible_capacity("Tractor", &slots(&[TimeSlot::Morning])), None);
        assert!(v.validate(500.0, "Tractor", &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_validate_exceeded_reports_max() {
        let v = CapacityValidator::default();
        let err = v.validate(40.0, "Drone Service", &slots(&[TimeSlot::Morning])).unwrap_err();
        assert_eq!(err, CapacityError::CapacityExceeded { max_allowed: 15.0, claimed: 40.0 });

        assert!(v.validate(15.0, "Drone Service", &slots(&[TimeSlot::Morning])).is_ok());
    }

    #[test]
    fn test_validate_requires_time_selection() {
        let v = CapacityValidator::default();
        let err = v.validate(10.0, "drone service", &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, CapacityError::TimeSelectionRequired { .. }));
    }

    #[test]
    fn test_zero_claim_always_passes() {
        let v = CapacityValidator::default();
        assert!(v.validate(0.0, "Spraying Drone", &BTreeSet::new()).is_ok());
    }

    #[test]
    fn test_negative_claim_rejected() {
        let v = CapacityValidator::default();
        assert!(matches!(
            v.validate(-1.0, "Spraying Drone", &slots(&[TimeSlot::Morning])),
            Err(CapacityError::InvalidClaim(_))
        ));
    }

    #[test]
    fn test_policy_is_configurable() {
        let policy = CapacityPolicy {
            morning_hours: 4.0,
            evening_hours: 2.0,
            any_time_hours: 8.0,
            throughputs: vec![CategoryThroughput { keyword: "harvester".to_string(), acres_per_hour: 2.0 }],
        };
        let v = CapacityValidator::new(policy);
        assert_eq!(v.max_plausible_capacity("Combine Harvester", &slots(&[TimeSlot::Morning, TimeSlot::Evening])), Some(12.0));
        assert_eq!(v.max_plausible_capacity("Spraying Drone", &slots(&[TimeSlot::Morning])), None);
    }
}
