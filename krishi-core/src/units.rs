use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Unit a listing is priced (and a booking's duration is measured) in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingUnit {
    PerAcre,
    PerDay,
    PerHour,
}

impl PricingUnit {
    /// Human label, also the wire form used by the pricing oracle.
    pub fn label(&self) -> &'static str {
        match self {
            PricingUnit::PerAcre => "Per Acre",
            PricingUnit::PerDay => "Per Day",
            PricingUnit::PerHour => "Per Hour",
        }
    }
}

impl fmt::Display for PricingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PricingUnit {
    type Err = CoreError;

    /// Accepts "Per Acre", "PER_ACRE", "perAcre", "acre" and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "peracre" | "acre" => Ok(PricingUnit::PerAcre),
            "perday" | "day" => Ok(PricingUnit::PerDay),
            "perhour" | "hour" => Ok(PricingUnit::PerHour),
            _ => Err(CoreError::ValidationError(format!("unknown pricing unit '{}'", s))),
        }
    }
}
