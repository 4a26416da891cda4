use tracing::debug;
use uuid::Uuid;

use shared_database::DataContext;
use shared_models::booking::Doctor;
use shared_models::error::BookingError;

use crate::models::DoctorFilters;

/// Read-only view over the doctor directory.
pub struct DoctorDirectory {
    data: DataContext,
}

impl DoctorDirectory {
    pub fn new(data: &DataContext) -> Self {
        Self { data: data.clone() }
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, BookingError> {
        self.data
            .store
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Doctor {} not found", doctor_id)))
    }

    pub async fn list_doctors(&self, filters: &DoctorFilters) -> Result<Vec<Doctor>, BookingError> {
        debug!("Listing doctors with filters {:?}", filters);

        let doctors = self.data.store.list_doctors().await?;
        Ok(doctors.into_iter().filter(|doctor| matches_filters(doctor, filters)).collect())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches_filters(doctor: &Doctor, filters: &DoctorFilters) -> bool {
    if let Some(specialization) = non_blank(&filters.specialization) {
        if !doctor.specialization.eq_ignore_ascii_case(specialization) {
            return false;
        }
    }

    if let Some(state) = non_blank(&filters.state) {
        if !doctor.state.eq_ignore_ascii_case(state) {
            return false;
        }
    }

    if let Some(search) = non_blank(&filters.search) {
        let needle = search.to_lowercase();
        let haystacks = [
            doctor.full_name(),
            doctor.specialization.clone(),
            doctor.city.clone(),
            doctor.practitioner_id.clone(),
        ];
        if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
            return false;
        }
    }

    true
}
