// libs/appointment-cell/src/services/dashboard.rs
use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::services::availability::AvailabilityRegistry;
use shared_database::DataContext;
use shared_models::booking::{Appointment, AppointmentStatus};
use shared_models::error::BookingError;

use crate::models::DoctorDashboard;

pub struct DashboardService {
    data: DataContext,
    registry: AvailabilityRegistry,
}

impl DashboardService {
    pub fn new(data: &DataContext) -> Self {
        Self {
            data: data.clone(),
            registry: AvailabilityRegistry::new(data),
        }
    }

    /// Day and week boundaries are UTC; the week is the ISO week containing `now`.
    pub async fn dashboard(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DoctorDashboard, BookingError> {
        if self.data.store.get_doctor(doctor_id).await?.is_none() {
            return Err(BookingError::NotFound(format!("Doctor {} not found", doctor_id)));
        }

        let appointments = self.data.store.appointments(Some(doctor_id)).await?;
        let active: Vec<&Appointment> = appointments.iter().filter(|a| a.status.is_active()).collect();

        let today = now.date_naive();
        let week = today.iso_week();

        let todays_appointments: Vec<Appointment> = active
            .iter()
            .filter(|a| a.start.date_naive() == today)
            .map(|a| (*a).clone())
            .collect();
        let appointments_this_week = active
            .iter()
            .filter(|a| a.start.date_naive().iso_week() == week)
            .count();
        let pending_confirmation = active
            .iter()
            .filter(|a| a.status == AppointmentStatus::Pending)
            .count();
        let total_patients = appointments
            .iter()
            .map(Appointment::patient_key)
            .collect::<HashSet<_>>()
            .len();

        let open_slots_next_7_days = self
            .registry
            .open_slots_between(doctor_id, now, now + Duration::days(7))
            .await?
            .len();

        debug!(
            "Dashboard for doctor {}: {} today, {} this week",
            doctor_id,
            todays_appointments.len(),
            appointments_this_week
        );

        Ok(DoctorDashboard {
            doctor_id,
            generated_at: now,
            appointments_today: todays_appointments.len(),
            todays_appointments,
            appointments_this_week,
            pending_confirmation,
            open_slots_next_7_days,
            total_patients,
        })
    }
}
