pub mod booking;
pub mod conflict;
pub mod dashboard;
pub mod lifecycle;

pub use booking::AppointmentBooker;
pub use conflict::ConflictDetectionService;
pub use dashboard::DashboardService;
pub use lifecycle::AppointmentLifecycleService;
