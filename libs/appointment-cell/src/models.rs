// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::booking::{Appointment, AppointmentMode, AppointmentStatus};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(rename = "doctor")]
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub mode: AppointmentMode,
    pub availability_slot: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilters {
    #[serde(rename = "doctor")]
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub mode: Option<AppointmentMode>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// Patients are not logged in; the email given at booking time identifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub patient_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    #[serde(rename = "doctor")]
    pub doctor_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardQuery {
    #[serde(rename = "doctor")]
    pub doctor_id: Option<Uuid>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDashboard {
    pub doctor_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub todays_appointments: Vec<Appointment>,
    pub appointments_today: usize,
    pub appointments_this_week: usize,
    pub pending_confirmation: usize,
    pub open_slots_next_7_days: usize,
    pub total_patients: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub released: Vec<Uuid>,
    pub rebooked: Vec<Uuid>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.released.is_empty() && self.rebooked.is_empty()
    }
}
