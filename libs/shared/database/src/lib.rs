pub mod locks;
pub mod memory;
pub mod seed;
pub mod store;

use std::sync::Arc;

pub use locks::DoctorLocks;
pub use memory::InMemoryBookingStore;
pub use store::{BookingStore, Change, ChangeSet, StoreError, StoreResult};

/// Store handle plus the per-doctor write serialization shared by every service.
#[derive(Clone)]
pub struct DataContext {
    pub store: Arc<dyn BookingStore>,
    pub locks: Arc<DoctorLocks>,
}

impl DataContext {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DoctorLocks::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBookingStore::new()))
    }
}
