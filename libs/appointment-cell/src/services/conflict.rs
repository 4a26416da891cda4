// libs/appointment-cell/src/services/conflict.rs
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::DataContext;
use shared_models::booking::{Appointment, TimeRange};
use shared_models::error::BookingError;

use crate::models::ConflictCheckResponse;

/// Overlap checks against a doctor's pending and confirmed appointments.
///
/// Both booking modes go through here, and through `TimeRange::overlaps`, so slot
/// bookings and on-demand requests never disagree about what a clash is.
pub struct ConflictDetectionService {
    data: DataContext,
}

impl ConflictDetectionService {
    pub fn new(data: &DataContext) -> Self {
        Self { data: data.clone() }
    }

    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        range: TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, BookingError> {
        debug!("Checking conflicts for doctor {} from {} to {}", doctor_id, range.start, range.end);

        let existing = self.data.store.appointments(Some(doctor_id)).await?;
        let conflicting_appointments = conflicting(&existing, range, exclude_appointment_id);

        if !conflicting_appointments.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} conflicting appointments",
                doctor_id,
                conflicting_appointments.len()
            );
        }

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            conflicting_appointments,
        })
    }

    /// Conflict error if anything active overlaps `range`.
    pub async fn ensure_free(&self, doctor_id: Uuid, range: TimeRange) -> Result<(), BookingError> {
        let response = self.check_conflicts(doctor_id, range, None).await?;
        match response.conflicting_appointments.first() {
            None => Ok(()),
            Some(clash) => Err(BookingError::Conflict(format!(
                "Requested time overlaps an existing appointment ({} - {})",
                clash.start, clash.end
            ))),
        }
    }
}

fn conflicting(existing: &[Appointment], range: TimeRange, exclude: Option<Uuid>) -> Vec<Appointment> {
    existing
        .iter()
        .filter(|appointment| Some(appointment.id) != exclude)
        .filter(|appointment| appointment.status.is_active())
        .filter(|appointment| appointment.range().overlaps(&range))
        .cloned()
        .collect()
}
