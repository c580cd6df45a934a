pub mod geo;
pub mod identity;
pub mod memory;
pub mod oracle;
pub mod repository;
pub mod units;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Identity rejected: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Case- and whitespace-insensitive key used for district, taluka and category comparisons.
pub fn normalize_key(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
