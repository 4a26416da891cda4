// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::booking::{Appointment, AppointmentMode, AppointmentStatus, Session};
use shared_models::error::BookingError;

/// Status state machine and who may drive it.
///
/// PENDING -> CONFIRMED | CANCELLED, CONFIRMED -> CANCELLED. CANCELLED is terminal.
#[derive(Debug, Default)]
pub struct AppointmentLifecycleService {
    auto_confirm_availability: bool,
}

impl AppointmentLifecycleService {
    pub fn new(auto_confirm_availability: bool) -> Self {
        Self { auto_confirm_availability }
    }

    /// Slot bookings are pre-approved by publishing the slot; on-demand ranges wait for the doctor.
    pub fn initial_status(&self, mode: AppointmentMode) -> AppointmentStatus {
        match mode {
            AppointmentMode::Availability if self.auto_confirm_availability => AppointmentStatus::Confirmed,
            AppointmentMode::Availability | AppointmentMode::OnDemand => AppointmentStatus::Pending,
        }
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(BookingError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Doctors confirm or cancel their own appointments; patients may only cancel
    /// their own appointment while it is still pending.
    pub fn authorize_transition(
        &self,
        session: &Session,
        appointment: &Appointment,
        new_status: AppointmentStatus,
    ) -> Result<(), BookingError> {
        match session {
            Session::Admin => Ok(()),
            Session::Doctor(doctor_id) if *doctor_id == appointment.doctor_id => Ok(()),
            Session::Doctor(_) => Err(BookingError::Forbidden(
                "Appointment belongs to another doctor".to_string(),
            )),
            Session::Patient { email } => {
                if !appointment.booked_by(email.as_deref()) {
                    return Err(BookingError::Forbidden(
                        "Appointment was booked under a different email".to_string(),
                    ));
                }
                if new_status != AppointmentStatus::Cancelled {
                    return Err(BookingError::Forbidden(
                        "Patients may only cancel appointments".to_string(),
                    ));
                }
                if appointment.status != AppointmentStatus::Pending {
                    return Err(BookingError::Forbidden(
                        "Confirmed appointments can only be cancelled by the doctor".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}
