use krishi_core::geo::Coordinates;
use krishi_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A farmer's search. Built per request and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmerRequest {
    pub soil_type: String,
    pub crop_type: String,
    pub district: String,
    #[serde(default)]
    pub taluka: Option<String>,
    pub land_size_acres: f64,
    /// Equipment category the farmer is looking for, e.g. "Drone Service"
    pub service_needed: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl FarmerRequest {
    pub fn validate(&self) -> CoreResult<()> {
        let required = [
            ("soil_type", &self.soil_type),
            ("crop_type", &self.crop_type),
            ("district", &self.district),
            ("service_needed", &self.service_needed),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{} is required", field)));
            }
        }

        if !self.land_size_acres.is_finite() || self.land_size_acres <= 0.0 {
            return Err(CoreError::ValidationError("land_size_acres must be greater than zero".into()));
        }

        if let Some(coords) = &self.coordinates {
            if !coords.is_valid() {
                return Err(CoreError::ValidationError("coordinates out of range".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FarmerRequest {
        FarmerRequest {
            soil_type: "Black".to_string(),
            crop_type: "Sugarcane".to_string(),
            district: "Pune".to_string(),
            taluka: Some("Haveli".to_string()),
            land_size_acres: 8.0,
            service_needed: "Drone Service".to_string(),
            coordinates: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_fields() {
        let mut r = request();
        r.service_needed = "  ".to_string();
        assert!(matches!(r.validate(), Err(CoreError::ValidationError(msg)) if msg.contains("service_needed")));

        let mut r = request();
        r.land_size_acres = 0.0;
        assert!(r.validate().is_err());

        let mut r = request();
        r.coordinates = Some(Coordinates::new(200.0, 0.0));
        assert!(r.validate().is_err());
    }
}
