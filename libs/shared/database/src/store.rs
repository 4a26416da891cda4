// libs/shared/database/src/store.rs
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use shared_models::booking::{Appointment, AppointmentStatus, AvailabilitySlot, Doctor, TimeRange};
use shared_models::error::BookingError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A change set precondition did not hold; nothing was written.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("record not found: {0}")]
    Missing(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PreconditionFailed(msg) => BookingError::Conflict(msg),
            StoreError::Missing(msg) => BookingError::NotFound(msg),
            StoreError::Backend(msg) => BookingError::Unavailable(msg),
        }
    }
}

/// One write inside a [`ChangeSet`]. Every variant carries the precondition it is guarded by.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Fails if the slot id exists or the range overlaps another slot of the same doctor.
    InsertSlot(AvailabilitySlot),
    /// Fails if the slot is missing or booked.
    DeleteUnbookedSlot { slot_id: Uuid },
    /// Compare-and-set on `is_booked`.
    SetSlotBooked { slot_id: Uuid, expected: bool, booked: bool },
    /// Fails if any pending or confirmed appointment of the doctor overlaps `range`.
    RequireFreeTime { doctor_id: Uuid, range: TimeRange },
    InsertAppointment(Appointment),
    /// Compare-and-set on the appointment status.
    SetAppointmentStatus {
        appointment_id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    },
}

/// Writes committed all-or-nothing by [`BookingStore::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    pub fn insert_slot(self, slot: AvailabilitySlot) -> Self {
        self.push(Change::InsertSlot(slot))
    }

    pub fn delete_unbooked_slot(self, slot_id: Uuid) -> Self {
        self.push(Change::DeleteUnbookedSlot { slot_id })
    }

    pub fn book_slot(self, slot_id: Uuid) -> Self {
        self.push(Change::SetSlotBooked { slot_id, expected: false, booked: true })
    }

    pub fn release_slot(self, slot_id: Uuid) -> Self {
        self.push(Change::SetSlotBooked { slot_id, expected: true, booked: false })
    }

    pub fn require_free_time(self, doctor_id: Uuid, range: TimeRange) -> Self {
        self.push(Change::RequireFreeTime { doctor_id, range })
    }

    pub fn insert_appointment(self, appointment: Appointment) -> Self {
        self.push(Change::InsertAppointment(appointment))
    }

    pub fn set_status(
        self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Self {
        self.push(Change::SetAppointmentStatus { appointment_id, expected, status })
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Persistence boundary of the booking core.
///
/// Reads return snapshots; `apply` is the only write path and must commit a change set
/// atomically, checking every precondition under the same write guard (or transaction).
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>>;

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>>;

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<AvailabilitySlot>>;

    /// All slots of a doctor ordered by `start`.
    async fn doctor_slots(&self, doctor_id: Uuid) -> StoreResult<Vec<AvailabilitySlot>>;

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;

    /// Appointments ordered by `start`, optionally restricted to one doctor.
    async fn appointments(&self, doctor_id: Option<Uuid>) -> StoreResult<Vec<Appointment>>;

    async fn apply(&self, changes: ChangeSet) -> StoreResult<()>;
}
