pub mod geo;
pub mod models;
pub mod request;
pub mod scorer;

pub use geo::{GeoFilter, Proximity};
pub use models::{MatchResult, ScoreBreakdown, SuggestedEquipment};
pub use request::FarmerRequest;
pub use scorer::{MatchScorer, MatchWeights};
