pub mod anomalies;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod service;

pub use anomalies::{PaymentAnomaly, PaymentAnomalyReport};
pub use lifecycle::{BookingAction, BookingError};
pub use models::{Booking, BookingDraft, BookingDuration, BookingStatus, FarmerLocation, PaymentStatus};
pub use repository::BookingRepository;
pub use service::BookingService;
