use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Extension, Json, Router,
};
use krishi_catalog::{EquipmentOffering, EquipmentStatus, VendorProfile, VendorStatus};
use krishi_core::identity::Actor;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/vendors", get(list_vendors))
        .route("/v1/vendors/{vendor_id}", get(get_vendor).put(register_vendor))
        .route("/v1/vendors/{vendor_id}/status", patch(set_vendor_status))
        .route("/v1/vendors/{vendor_id}/equipment/{equipment_id}", get(get_offering))
        .route(
            "/v1/vendors/{vendor_id}/equipment/{equipment_id}/status",
            patch(set_offering_status),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub district: Option<String>,
    #[serde(rename = "equipmentCategory")]
    pub equipment_category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VendorStatusRequest {
    pub status: VendorStatus,
}

#[derive(Debug, Deserialize)]
pub struct OfferingStatusRequest {
    pub status: EquipmentStatus,
}

#[derive(Debug, Serialize)]
pub struct OfferingResponse {
    pub vendor_id: String,
    pub vendor_name: String,
    #[serde(flatten)]
    pub offering: EquipmentOffering,
    /// Informational quote for per-acre listings with a capacity claim.
    pub derived_day_price: Option<f64>,
}

impl OfferingResponse {
    pub(crate) fn new(vendor: &VendorProfile, offering: EquipmentOffering) -> Self {
        Self {
            vendor_id: vendor.vendor_id.clone(),
            vendor_name: vendor.vendor_name.clone(),
            derived_day_price: offering.derived_day_price(),
            offering,
        }
    }
}

/// Only the vendor itself (or an operator, when allowed) may change a profile.
pub(crate) fn ensure_vendor_owner(actor: &Actor, vendor_id: &str, operator_allowed: bool) -> Result<(), AppError> {
    if actor.is_vendor(vendor_id) || (operator_allowed && actor.is_operator()) {
        Ok(())
    } else {
        Err(AppError::AuthorizationError(format!(
            "{} may not modify vendor {}",
            actor.role.as_str(),
            vendor_id
        )))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/vendors?district=&equipmentCategory=
async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<VendorProfile>>, AppError> {
    let vendors = state
        .directory
        .find_candidates(query.district.as_deref(), query.equipment_category.as_deref())
        .await?;
    Ok(Json(vendors))
}

/// GET /v1/vendors/{vendor_id}
async fn get_vendor(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> Result<Json<VendorProfile>, AppError> {
    Ok(Json(state.directory.get_vendor(&vendor_id).await?))
}

/// PUT /v1/vendors/{vendor_id}
/// Register or edit the caller's own profile. Status and the price of
/// existing offerings are kept from the stored profile.
async fn register_vendor(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(vendor_id): Path<String>,
    Json(profile): Json<VendorProfile>,
) -> Result<Json<VendorProfile>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, false)?;
    if profile.vendor_id != vendor_id {
        return Err(AppError::ValidationError(
            "vendor_id in body does not match the path".to_string(),
        ));
    }

    Ok(Json(state.directory.register(profile).await?))
}

/// PATCH /v1/vendors/{vendor_id}/status
async fn set_vendor_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(vendor_id): Path<String>,
    Json(req): Json<VendorStatusRequest>,
) -> Result<Json<VendorProfile>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, true)?;
    Ok(Json(state.directory.set_vendor_status(&vendor_id, req.status, &actor).await?))
}

/// GET /v1/vendors/{vendor_id}/equipment/{equipment_id}
async fn get_offering(
    State(state): State<AppState>,
    Path((vendor_id, equipment_id)): Path<(String, String)>,
) -> Result<Json<OfferingResponse>, AppError> {
    let (vendor, offering) = state.directory.get_offering(&vendor_id, &equipment_id).await?;
    Ok(Json(OfferingResponse::new(&vendor, offering)))
}

/// PATCH /v1/vendors/{vendor_id}/equipment/{equipment_id}/status
async fn set_offering_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((vendor_id, equipment_id)): Path<(String, String)>,
    Json(req): Json<OfferingStatusRequest>,
) -> Result<Json<OfferingResponse>, AppError> {
    ensure_vendor_owner(&actor, &vendor_id, false)?;
    state
        .directory
        .set_offering_status(&vendor_id, &equipment_id, req.status)
        .await?;

    let (vendor, offering) = state.directory.get_offering(&vendor_id, &equipment_id).await?;
    Ok(Json(OfferingResponse::new(&vendor, offering)))
}
