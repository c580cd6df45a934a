use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use krishi_core::identity::{Actor, ActorRole};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    /// FARMER, VENDOR or OPERATOR
    pub role: String,
    pub exp: usize,
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Decode the bearer token and inject the resulting `Actor` into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    // 2. Decode and validate JWT
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    // 3. Resolve role
    let role: ActorRole = token_data.claims.role.parse()?;

    // 4. Inject actor
    req.extensions_mut().insert(Actor {
        id: token_data.claims.sub,
        role,
    });

    Ok(next.run(req).await)
}

// ============================================================================
// Role Check Helper
// ============================================================================

pub fn require_role(actor: &Actor, allowed: &[ActorRole]) -> Result<(), AppError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::AuthorizationError(format!(
            "{} is not allowed to perform this action",
            actor.role.as_str()
        )))
    }
}
