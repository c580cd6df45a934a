use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request sent to the external price-suggestion oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub equipment_type: String,
    pub acreage: f64,
    pub comparable_listings: String,
    /// One of "Per Acre", "Per Day", "Per Hour".
    pub pricing_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_considerations: Option<String>,
}

/// Raw oracle answer. Every field is untrusted until the advisor validates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    #[serde(default)]
    pub suggested_price: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub effective_pricing_unit: Option<String>,
}

#[async_trait]
pub trait PricingOracle: Send + Sync {
    /// Ask the oracle for a suggested listing price
    async fn suggest_price(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, Box<dyn std::error::Error + Send + Sync>>;
}
