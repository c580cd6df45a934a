pub mod availability;
pub mod capacity;
pub mod directory;
pub mod pricing;
pub mod vendor;

pub use availability::{AvailabilityCalendar, CalendarError, OperatingDay};
pub use capacity::{CapacityError, CapacityPolicy, CapacityValidator, TimeSlot};
pub use directory::{DirectoryError, VendorDirectory};
pub use pricing::{AdvisorError, ConfirmedPrice, PriceSuggestion, PricingAdvisor, SuggestionRequest};
pub use vendor::{EquipmentOffering, EquipmentStatus, VendorLocation, VendorProfile, VendorStatus};
