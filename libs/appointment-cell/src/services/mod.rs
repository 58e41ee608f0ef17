pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod slots;

pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
pub use slots::AvailabilityEngine;
