use krishi_booking::BookingService;
use krishi_catalog::{PricingAdvisor, VendorDirectory};
use krishi_match::MatchScorer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<VendorDirectory>,
    pub bookings: Arc<BookingService>,
    pub scorer: Arc<MatchScorer>,
    /// `None` when no oracle endpoint is configured.
    pub advisor: Option<Arc<PricingAdvisor>>,
    pub auth: AuthConfig,
}
