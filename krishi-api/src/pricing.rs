use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use krishi_catalog::{ConfirmedPrice, PriceSuggestion, SuggestionRequest};
use krishi_core::identity::{Actor, ActorRole};
use krishi_core::units::PricingUnit;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::require_role;
use crate::state::AppState;
use crate::vendors::{ensure_vendor_owner, OfferingResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/pricing/suggest", post(suggest_price))
        .route(
            "/v1/vendors/{vendor_id}/equipment/{equipment_id}/price",
            post(confirm_price),
        )
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: Option<PriceSuggestion>,
    /// Why there is no suggestion
    pub reason: Option<String>,
}

impl SuggestionResponse {
    fn none(reason: &str) -> Self {
        Self {
            suggestion: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Either accept a suggestion as-is, or state the final price explicitly.
#[derive(Debug, Deserialize)]
pub struct ConfirmPriceRequest {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub pricing_unit: Option<PricingUnit>,
    #[serde(default)]
    pub suggestion: Option<PriceSuggestion>,
}

impl ConfirmPriceRequest {
    fn into_confirmed(self) -> Result<ConfirmedPrice, AppError> {
        match (self.price, self.suggestion) {
            (Some(price), suggestion) => {
                let unit = self
                    .pricing_unit
                    .or(suggestion.as_ref().map(|s| s.effective_pricing_unit))
                    .ok_or_else(|| AppError::ValidationError("pricing_unit is required".to_string()))?;
                Ok(ConfirmedPrice::manual(price, unit, suggestion.map(|s| s.suggested_price))?)
            }
            (None, Some(suggestion)) => Ok(ConfirmedPrice::accept(&suggestion)),
            (None, None) => Err(AppError::ValidationError(
                "either price or suggestion is required".to_string(),
            )),
        }
    }
}

/// POST /v1/pricing/suggest
/// Always 200 for a valid request; an unreachable oracle yields `suggestion: null`
async fn suggest_price(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    require_role(&actor, &[ActorRole::Vendor])?;
    req.validate()?;

    let Some(advisor) = state.advisor.as_ref() else {
        return Ok(Json(SuggestionResponse::none("Pricing advisor is not configured")));
    };

    let response = match advisor.suggest_or_none(&req).await? {
        Some(suggestion) => SuggestionResponse {
            suggestion: Some(suggestion),
            reason: None,
        },
        None => SuggestionResponse::none("Pricing advisor is unavailable, enter a price manually"),
    };
    Ok(Json(response))
}

/// POST /v1/vendors/{vendor_id}/equipment/{equipment_id}/price
/// The only way a listing price changes
async fn confirm_price(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((vendor_id, equipment_id)): Path<(String, String)>,
    Json(req): Json<ConfirmPriceRequest>,
) -> Result<Json<OfferingResponse>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, false)?;
    let confirmed = req.into_confirmed()?;

    state
        .directory
        .apply_confirmed_price(&vendor_id, &equipment_id, &confirmed)
        .await?;

    let (vendor, offering) = state.directory.get_offering(&vendor_id, &equipment_id).await?;
    Ok(Json(OfferingResponse::new(&vendor, offering)))
}
