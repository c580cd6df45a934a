use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Farmer,
    Vendor,
    Operator,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Farmer => "FARMER",
            ActorRole::Vendor => "VENDOR",
            ActorRole::Operator => "OPERATOR",
        }
    }
}

impl FromStr for ActorRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FARMER" => Ok(ActorRole::Farmer),
            "VENDOR" => Ok(ActorRole::Vendor),
            "OPERATOR" => Ok(ActorRole::Operator),
            other => Err(CoreError::IdentityError(format!("unknown role '{}'", other))),
        }
    }
}

/// Authenticated party as asserted by the external identity provider.
/// `id` is a farmer reference or a vendor id depending on `role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn farmer(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Farmer }
    }

    pub fn vendor(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Vendor }
    }

    pub fn operator(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Operator }
    }

    /// True when this actor is the vendor identified by `vendor_id`.
    pub fn is_vendor(&self, vendor_id: &str) -> bool {
        self.role == ActorRole::Vendor && self.id == vendor_id
    }

    pub fn is_farmer(&self, farmer_ref: &str) -> bool {
        self.role == ActorRole::Farmer && self.id == farmer_ref
    }

    pub fn is_operator(&self) -> bool {
        self.role == ActorRole::Operator
    }
}
