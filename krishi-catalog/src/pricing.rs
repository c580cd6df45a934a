use krishi_core::oracle::{OracleRequest, PricingOracle};
use krishi_core::units::PricingUnit;
use krishi_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Pricing advisor unavailable: {0}")]
    Unavailable(String),
}

/// What a vendor asks the advisor about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub equipment_type: String,
    pub acreage: f64,
    pub pricing_unit: PricingUnit,
    pub comparable_listings: String,
    #[serde(default)]
    pub travel_charge: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SuggestionRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.equipment_type.trim().is_empty() {
            return Err(CoreError::ValidationError("equipment_type must not be empty".into()));
        }
        if !self.acreage.is_finite() || self.acreage <= 0.0 {
            return Err(CoreError::ValidationError("acreage must be greater than zero".into()));
        }
        if let Some(charge) = self.travel_charge {
            if !charge.is_finite() || charge < 0.0 {
                return Err(CoreError::ValidationError("travel_charge cannot be negative".into()));
            }
        }
        Ok(())
    }

    fn to_oracle_request(&self) -> OracleRequest {
        OracleRequest {
            equipment_type: self.equipment_type.trim().to_string(),
            acreage: self.acreage,
            comparable_listings: self.comparable_listings.clone(),
            pricing_unit: self.pricing_unit.label().to_string(),
            travel_charge: self.travel_charge,
            additional_considerations: self.notes.clone().filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Advisory price. Holding one changes nothing; see [`ConfirmedPrice`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSuggestion {
    pub suggested_price: f64,
    pub reasoning: String,
    pub effective_pricing_unit: PricingUnit,
    /// The oracle's unit was missing or unrecognised and the requested unit was used.
    pub unit_defaulted: bool,
}

/// A price the vendor explicitly chose. The only way to change a listing price.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedPrice {
    price: f64,
    unit: PricingUnit,
    suggested_price: Option<f64>,
}

impl ConfirmedPrice {
    /// Vendor accepts the suggestion as offered.
    pub fn accept(suggestion: &PriceSuggestion) -> Self {
        Self {
            price: suggestion.suggested_price,
            unit: suggestion.effective_pricing_unit,
            suggested_price: Some(suggestion.suggested_price),
        }
    }

    /// Vendor enters (or edits) the final price, optionally recording what was suggested.
    pub fn manual(price: f64, unit: PricingUnit, suggested_price: Option<f64>) -> CoreResult<Self> {
        if !price.is_finite() || price < 0.0 {
            return Err(CoreError::ValidationError("price must be a non-negative number".into()));
        }
        Ok(Self { price, unit, suggested_price })
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn unit(&self) -> PricingUnit {
        self.unit
    }

    pub fn suggested_price(&self) -> Option<f64> {
        self.suggested_price
    }
}

/// Wraps the external pricing oracle with a timeout and response validation.
pub struct PricingAdvisor {
    oracle: Arc<dyn PricingOracle>,
    timeout: Duration,
}

impl PricingAdvisor {
    pub fn new(oracle: Arc<dyn PricingOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<PriceSuggestion, AdvisorError> {
        request.validate()?;

        let oracle_request = request.to_oracle_request();
        let response = tokio::time::timeout(self.timeout, self.oracle.suggest_price(&oracle_request))
            .await
            .map_err(|_| AdvisorError::Unavailable(format!("no answer within {:?}", self.timeout)))?
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;

        let suggested_price = match response.suggested_price {
            Some(price) if price.is_finite() && price >= 0.0 => price,
            other => {
                return Err(AdvisorError::Unavailable(format!(
                    "malformed suggested price {:?}",
                    other
                )))
            }
        };

        let parsed_unit = response
            .effective_pricing_unit
            .as_deref()
            .and_then(|raw| raw.parse::<PricingUnit>().ok());

        Ok(PriceSuggestion {
            suggested_price,
            reasoning: response.reasoning.unwrap_or_default(),
            effective_pricing_unit: parsed_unit.unwrap_or(request.pricing_unit),
            unit_defaulted: parsed_unit.is_none(),
        })
    }

    /// Like [`suggest`](Self::suggest), but an unavailable oracle is "no suggestion".
    /// Only request validation errors are returned.
    pub async fn suggest_or_none(&self, request: &SuggestionRequest) -> Result<Option<PriceSuggestion>, CoreError> {
        match self.suggest(request).await {
            Ok(suggestion) => Ok(Some(suggestion)),
            Err(AdvisorError::Validation(e)) => Err(e),
            Err(AdvisorError::Unavailable(reason)) => {
                tracing::warn!(equipment_type = %request.equipment_type, "No price suggestion: {}", reason);
                Ok(None)
            }
        }
    }
}
