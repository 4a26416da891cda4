// libs/shared/models/src/booking.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// DOCTOR DIRECTORY RECORD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub practitioner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==============================================================================
// TIME RANGES
// ==============================================================================

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// `[a,b)` and `[c,d)` overlap iff `a < d && b > c`. Back-to-back ranges do not.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.start.date_naive() == date
    }
}

// ==============================================================================
// AVAILABILITY SLOTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    #[serde(rename = "doctor")]
    pub doctor_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_booked: bool,
}

impl AvailabilitySlot {
    pub fn range(&self) -> TimeRange {
        TimeRange { start: self.start, end: self.end }
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentMode {
    Availability,
    OnDemand,
}

impl fmt::Display for AppointmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentMode::Availability => write!(f, "AVAILABILITY"),
            AppointmentMode::OnDemand => write!(f, "ON_DEMAND"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold the doctor's time.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    #[serde(rename = "doctor")]
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub mode: AppointmentMode,
    pub status: AppointmentStatus,
    pub availability_slot: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn range(&self) -> TimeRange {
        TimeRange { start: self.start, end: self.end }
    }

    /// Identity used to count distinct patients: email when present, name otherwise.
    pub fn patient_key(&self) -> String {
        match self.patient_email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email.to_lowercase(),
            _ => self.patient_name.trim().to_lowercase(),
        }
    }

    /// True when `email` matches the booking email, ignoring case and surrounding whitespace.
    pub fn booked_by(&self, email: Option<&str>) -> bool {
        match (email.map(str::trim), self.patient_email.as_deref().map(str::trim)) {
            (Some(given), Some(booked)) if !booked.is_empty() => given.eq_ignore_ascii_case(booked),
            _ => false,
        }
    }
}

// ==============================================================================
// SESSIONS
// ==============================================================================

/// Who is acting. Passed explicitly into every mutating booking operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Doctor(Uuid),
    Patient { email: Option<String> },
    Admin,
}

impl Session {
    pub fn can_manage_doctor(&self, doctor_id: Uuid) -> bool {
        match self {
            Session::Admin => true,
            Session::Doctor(id) => *id == doctor_id,
            Session::Patient { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_time_range_rejects_empty_and_inverted() {
        assert!(TimeRange::new(at(9, 0), at(9, 0)).is_none());
        assert!(TimeRange::new(at(9, 30), at(9, 0)).is_none());
        assert!(TimeRange::new(at(9, 0), at(9, 30)).is_some());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let booked = TimeRange::new(at(10, 0), at(10, 30)).unwrap();
        let straddling = TimeRange::new(at(10, 15), at(10, 45)).unwrap();
        let back_to_back = TimeRange::new(at(10, 30), at(11, 0)).unwrap();
        let inside = TimeRange::new(at(10, 5), at(10, 10)).unwrap();

        assert!(booked.overlaps(&straddling));
        assert!(straddling.overlaps(&booked));
        assert!(booked.overlaps(&inside));
        assert!(!booked.overlaps(&back_to_back));
        assert!(!back_to_back.overlaps(&booked));
    }

    #[test]
    fn test_wire_format_matches_api_contract() {
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            start: at(9, 0),
            end: at(9, 30),
            is_booked: false,
        };
        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["doctor"], serde_json::json!(slot.doctor_id));
        assert_eq!(value["start"], "2024-01-15T09:00:00Z");

        let mode: AppointmentMode = serde_json::from_str("\"ON_DEMAND\"").unwrap();
        assert_eq!(mode, AppointmentMode::OnDemand);
        assert_eq!(serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(), "\"CANCELLED\"");
    }

    #[test]
    fn test_session_scope() {
        let doctor = Uuid::new_v4();
        assert!(Session::Doctor(doctor).can_manage_doctor(doctor));
        assert!(!Session::Doctor(doctor).can_manage_doctor(Uuid::new_v4()));
        assert!(Session::Admin.can_manage_doctor(doctor));
        assert!(!Session::Patient { email: None }.can_manage_doctor(doctor));
    }

    #[test]
    fn test_booked_by_ignores_case_and_whitespace() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_name: "Sarah Wilson".to_string(),
            patient_email: Some(" sarah@example.com".to_string()),
            patient_phone: None,
            mode: AppointmentMode::OnDemand,
            status: AppointmentStatus::Pending,
            availability_slot: None,
            start: at(10, 0),
            end: at(10, 30),
            notes: None,
            created_at: at(8, 0),
        };

        assert!(appointment.booked_by(Some("SARAH@example.com  ")));
        assert!(!appointment.booked_by(Some("other@example.com")));
        assert!(!appointment.booked_by(None));

        let anonymous = Appointment { patient_email: None, ..appointment };
        assert!(!anonymous.booked_by(Some("sarah@example.com")));
    }
}
