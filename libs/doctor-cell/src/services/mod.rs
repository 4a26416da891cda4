pub mod availability;
pub mod directory;

pub use availability::AvailabilityRegistry;
pub use directory::DoctorDirectory;
