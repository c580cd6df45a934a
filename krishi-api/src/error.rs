use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use krishi_booking::BookingError;
use krishi_catalog::{AdvisorError, CalendarError, CapacityError, DirectoryError};
use krishi_core::repository::StoreError;
use krishi_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    /// 422. `max_allowed` is set when a capacity claim was rejected.
    UnprocessableError {
        message: String,
        max_allowed: Option<f64>,
    },
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, max_allowed) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::UnprocessableError { message, max_allowed } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, max_allowed)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match max_allowed {
            Some(max) => json!({ "error": error_message, "maxAllowed": max }),
            None => json!({ "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            CoreError::IdentityError(_) => AppError::AuthenticationError(err.to_string()),
            CoreError::InternalError(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<CapacityError> for AppError {
    fn from(err: CapacityError) -> Self {
        match err {
            CapacityError::CapacityExceeded { max_allowed, .. } => AppError::UnprocessableError {
                message: err.to_string(),
                max_allowed: Some(max_allowed),
            },
            CapacityError::TimeSelectionRequired { .. } => AppError::UnprocessableError {
                message: err.to_string(),
                max_allowed: None,
            },
            CapacityError::InvalidClaim(_) => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::VendorNotFound(_) | DirectoryError::EquipmentNotFound { .. } => {
                AppError::NotFoundError(err.to_string())
            }
            DirectoryError::Capacity { equipment_id, source } => {
                tracing::info!(%equipment_id, "Capacity claim rejected: {}", source);
                source.into()
            }
            DirectoryError::NotPermitted { .. } => AppError::AuthorizationError(err.to_string()),
            DirectoryError::Validation(e) => e.into(),
            DirectoryError::Store(e) => e.into(),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::NotPermitted { .. } => AppError::AuthorizationError(err.to_string()),
            BookingError::InvalidTransition { .. }
            | BookingError::InvalidPaymentChange { .. }
            | BookingError::VendorClosed { .. }
            | BookingError::EquipmentUnavailable(_)
            | BookingError::Conflict(_) => AppError::ConflictError(err.to_string()),
            BookingError::Validation(e) => e.into(),
            BookingError::Directory(e) => e.into(),
            BookingError::Store(e) => e.into(),
        }
    }
}

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::Validation(e) => e.into(),
            AdvisorError::Unavailable(msg) => AppError::InternalServerError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rejection_carries_max_allowed() {
        let err: AppError = DirectoryError::Capacity {
            equipment_id: "equip_drone_01".to_string(),
            source: CapacityError::CapacityExceeded { max_allowed: 30.0, claimed: 100.0 },
        }
        .into();

        match err {
            AppError::UnprocessableError { max_allowed, .. } => assert_eq!(max_allowed, Some(30.0)),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_booking_errors_map_to_statuses() {
        let not_found = AppError::from(BookingError::NotFound("b1".to_string())).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = AppError::from(BookingError::Conflict("b1".to_string())).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid = AppError::from(BookingError::Validation(CoreError::ValidationError("bad".into())))
            .into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }
}
