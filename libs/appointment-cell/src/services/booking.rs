// libs/appointment-cell/src/services/booking.rs
use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::availability::AvailabilityRegistry;
use shared_config::BookingRules;
use shared_database::{ChangeSet, DataContext};
use shared_models::booking::{
    Appointment, AppointmentMode, AppointmentStatus, AvailabilitySlot, Session, TimeRange,
};
use shared_models::error::BookingError;

use crate::models::{AppointmentFilters, CreateAppointmentRequest, ReconciliationReport};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

/// Creates appointments and drives their status.
///
/// Every write for a doctor happens under that doctor's lock, and the final
/// change set re-asserts its preconditions inside the store.
pub struct AppointmentBooker {
    data: DataContext,
    registry: AvailabilityRegistry,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBooker {
    pub fn new(data: &DataContext, rules: &BookingRules) -> Self {
        Self {
            data: data.clone(),
            registry: AvailabilityRegistry::new(data),
            conflict_service: ConflictDetectionService::new(data),
            lifecycle_service: AppointmentLifecycleService::new(rules.auto_confirm_availability),
        }
    }

    pub async fn create_appointment(
        &self,
        session: &Session,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        info!("Booking {} appointment with doctor {}", request.mode, request.doctor_id);

        let patient_name = request.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(BookingError::Validation("Patient name is required".to_string()));
        }
        if let Session::Doctor(own_id) = session {
            if *own_id != request.doctor_id {
                return Err(BookingError::Forbidden(
                    "Doctors may only book into their own calendar".to_string(),
                ));
            }
        }
        self.ensure_doctor(request.doctor_id).await?;

        let appointment = match request.mode {
            AppointmentMode::Availability => self.book_slot(patient_name, request).await,
            AppointmentMode::OnDemand => self.book_on_demand(patient_name, request).await,
        }
        .inspect_err(|e| warn!("Booking rejected: {}", e))?;

        info!(
            "Appointment {} created for doctor {} ({} - {}, {})",
            appointment.id, appointment.doctor_id, appointment.start, appointment.end, appointment.status
        );
        Ok(appointment)
    }

    async fn book_slot(
        &self,
        patient_name: String,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let slot_id = request.availability_slot.ok_or_else(|| {
            BookingError::Validation("Availability bookings require an availability slot".to_string())
        })?;

        let _guard = self.data.locks.acquire(request.doctor_id).await;

        let slot = self.registry.get_slot(slot_id).await?;
        if slot.doctor_id != request.doctor_id {
            return Err(BookingError::Validation(format!(
                "Availability slot {} does not belong to doctor {}",
                slot_id, request.doctor_id
            )));
        }
        let start_differs = request.start.is_some_and(|start| start != slot.start);
        let end_differs = request.end.is_some_and(|end| end != slot.end);
        if start_differs || end_differs {
            return Err(BookingError::Validation(
                "Requested times do not match the availability slot".to_string(),
            ));
        }
        if slot.is_booked {
            return Err(BookingError::Conflict(format!("Availability slot {} is already booked", slot_id)));
        }

        let range = slot.range();
        self.conflict_service.ensure_free(slot.doctor_id, range).await?;

        let appointment = self.new_appointment(patient_name, &request, Some(&slot), range);
        let changes = ChangeSet::new()
            .book_slot(slot.id)
            .require_free_time(slot.doctor_id, range)
            .insert_appointment(appointment.clone());
        self.data.store.apply(changes).await?;

        debug!("Slot {} bound to appointment {}", slot.id, appointment.id);
        Ok(appointment)
    }

    async fn book_on_demand(
        &self,
        patient_name: String,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        if request.availability_slot.is_some() {
            return Err(BookingError::Validation(
                "On-demand bookings must not reference an availability slot".to_string(),
            ));
        }
        let (start, end) = match (request.start, request.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(BookingError::Validation(
                    "On-demand bookings require start and end".to_string(),
                ))
            }
        };
        let range = TimeRange::new(start, end).ok_or_else(|| {
            BookingError::Validation("Invalid range: start time must be before end time".to_string())
        })?;

        let _guard = self.data.locks.acquire(request.doctor_id).await;

        self.conflict_service.ensure_free(request.doctor_id, range).await?;

        let appointment = self.new_appointment(patient_name, &request, None, range);
        let changes = ChangeSet::new()
            .require_free_time(request.doctor_id, range)
            .insert_appointment(appointment.clone());
        self.data.store.apply(changes).await?;

        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.data
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment {} not found", appointment_id)))
    }

    /// Moves an appointment along the status machine. Cancelling a slot-bound
    /// appointment frees the slot in the same change set.
    pub async fn update_status(
        &self,
        session: &Session,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        debug!("Updating appointment {} to {}", appointment_id, new_status);

        let appointment = self.get_appointment(appointment_id).await?;
        self.lifecycle_service.authorize_transition(session, &appointment, new_status)?;

        let _guard = self.data.locks.acquire(appointment.doctor_id).await;

        // Re-read under the lock; a concurrent update may have moved it.
        let mut appointment = self.get_appointment(appointment_id).await?;
        self.lifecycle_service.authorize_transition(session, &appointment, new_status)?;
        self.lifecycle_service
            .validate_status_transition(appointment.status, new_status)?;

        let mut changes = ChangeSet::new().set_status(appointment.id, appointment.status, new_status);
        if new_status == AppointmentStatus::Cancelled {
            if let Some(slot_id) = appointment.availability_slot {
                match self.data.store.get_slot(slot_id).await? {
                    Some(slot) if slot.is_booked => changes = changes.release_slot(slot_id),
                    Some(_) => {}
                    None => warn!("Appointment {} references missing slot {}", appointment.id, slot_id),
                }
            }
        }
        self.data.store.apply(changes).await?;

        info!("Appointment {} moved {} -> {}", appointment.id, appointment.status, new_status);
        appointment.status = new_status;
        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>, BookingError> {
        let appointments = self.data.store.appointments(filters.doctor_id).await?;
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Ok(appointments
            .into_iter()
            .filter(|a| filters.status.map_or(true, |status| a.status == status))
            .filter(|a| filters.mode.map_or(true, |mode| a.mode == mode))
            .filter(|a| match &search {
                None => true,
                Some(needle) => {
                    a.patient_name.to_lowercase().contains(needle)
                        || a.patient_email
                            .as_deref()
                            .is_some_and(|email| email.to_lowercase().contains(needle))
                }
            })
            .collect())
    }

    /// Brings slot `is_booked` flags back in line with the active appointments bound to them.
    pub async fn reconcile_slots(
        &self,
        session: &Session,
        doctor_id: Uuid,
    ) -> Result<ReconciliationReport, BookingError> {
        if !session.can_manage_doctor(doctor_id) {
            return Err(BookingError::Forbidden(format!(
                "Not authorized to reconcile slots of doctor {}",
                doctor_id
            )));
        }
        self.ensure_doctor(doctor_id).await?;

        let _guard = self.data.locks.acquire(doctor_id).await;

        let held: HashSet<Uuid> = self
            .data
            .store
            .appointments(Some(doctor_id))
            .await?
            .into_iter()
            .filter(|a| a.status.is_active())
            .filter_map(|a| a.availability_slot)
            .collect();

        let mut report = ReconciliationReport::default();
        for slot in self.data.store.doctor_slots(doctor_id).await? {
            let should_be_booked = held.contains(&slot.id);
            if slot.is_booked && !should_be_booked {
                self.registry.mark_released(slot.id).await?;
                report.released.push(slot.id);
            } else if !slot.is_booked && should_be_booked {
                self.registry.mark_booked(slot.id).await?;
                report.rebooked.push(slot.id);
            }
        }

        if report.is_clean() {
            debug!("Slots of doctor {} are consistent", doctor_id);
        } else {
            warn!(
                "Reconciled doctor {}: released {}, re-booked {}",
                doctor_id,
                report.released.len(),
                report.rebooked.len()
            );
        }
        Ok(report)
    }

    fn new_appointment(
        &self,
        patient_name: String,
        request: &CreateAppointmentRequest,
        slot: Option<&AvailabilitySlot>,
        range: TimeRange,
    ) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_name,
            patient_email: non_blank(&request.patient_email),
            patient_phone: non_blank(&request.patient_phone),
            mode: request.mode,
            status: self.lifecycle_service.initial_status(request.mode),
            availability_slot: slot.map(|s| s.id),
            start: range.start,
            end: range.end,
            notes: non_blank(&request.notes),
            created_at: Utc::now(),
        }
    }

    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), BookingError> {
        match self.data.store.get_doctor(doctor_id).await? {
            Some(_) => Ok(()),
            None => Err(BookingError::NotFound(format!("Doctor {} not found", doctor_id))),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
