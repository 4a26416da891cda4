// libs/shared/database/src/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::booking::{Appointment, AvailabilitySlot, Doctor};

use crate::store::{BookingStore, Change, ChangeSet, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    slots: HashMap<Uuid, AvailabilitySlot>,
    appointments: HashMap<Uuid, Appointment>,
}

/// Inverse of one applied change, replayed in reverse when a later change fails.
enum Undo {
    RemoveSlot(Uuid),
    RestoreSlot(AvailabilitySlot),
    RemoveAppointment(Uuid),
    RestoreAppointment(Appointment),
}

/// Single-writer store: one `RwLock` over all tables, so `apply` is serializable.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    tables: RwLock<Tables>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        let doctors = doctors.into_iter().map(|doctor| (doctor.id, doctor)).collect();
        Self {
            tables: RwLock::new(Tables { doctors, ..Tables::default() }),
        }
    }
}

impl Tables {
    fn apply_one(&mut self, change: Change) -> StoreResult<Option<Undo>> {
        match change {
            Change::InsertSlot(slot) => {
                if self.slots.contains_key(&slot.id) {
                    return Err(StoreError::PreconditionFailed(format!("slot {} already exists", slot.id)));
                }
                let range = slot.range();
                if let Some(existing) = self
                    .slots
                    .values()
                    .find(|other| other.doctor_id == slot.doctor_id && other.range().overlaps(&range))
                {
                    return Err(StoreError::PreconditionFailed(format!(
                        "slot overlaps existing slot {} ({} - {})",
                        existing.id, existing.start, existing.end
                    )));
                }
                let id = slot.id;
                self.slots.insert(id, slot);
                Ok(Some(Undo::RemoveSlot(id)))
            }
            Change::DeleteUnbookedSlot { slot_id } => {
                let slot = self
                    .slots
                    .get(&slot_id)
                    .ok_or_else(|| StoreError::Missing(format!("slot {}", slot_id)))?;
                if slot.is_booked {
                    return Err(StoreError::PreconditionFailed(format!("slot {} is booked", slot_id)));
                }
                Ok(self.slots.remove(&slot_id).map(Undo::RestoreSlot))
            }
            Change::SetSlotBooked { slot_id, expected, booked } => {
                let slot = self
                    .slots
                    .get_mut(&slot_id)
                    .ok_or_else(|| StoreError::Missing(format!("slot {}", slot_id)))?;
                if slot.is_booked != expected {
                    return Err(StoreError::PreconditionFailed(format!(
                        "slot {} is_booked is {}, expected {}",
                        slot_id, slot.is_booked, expected
                    )));
                }
                let previous = slot.clone();
                slot.is_booked = booked;
                Ok(Some(Undo::RestoreSlot(previous)))
            }
            Change::RequireFreeTime { doctor_id, range } => {
                let clash = self.appointments.values().find(|appointment| {
                    appointment.doctor_id == doctor_id
                        && appointment.status.is_active()
                        && appointment.range().overlaps(&range)
                });
                match clash {
                    Some(appointment) => Err(StoreError::PreconditionFailed(format!(
                        "time overlaps appointment {}",
                        appointment.id
                    ))),
                    None => Ok(None),
                }
            }
            Change::InsertAppointment(appointment) => {
                if self.appointments.contains_key(&appointment.id) {
                    return Err(StoreError::PreconditionFailed(format!(
                        "appointment {} already exists",
                        appointment.id
                    )));
                }
                let id = appointment.id;
                self.appointments.insert(id, appointment);
                Ok(Some(Undo::RemoveAppointment(id)))
            }
            Change::SetAppointmentStatus { appointment_id, expected, status } => {
                let appointment = self
                    .appointments
                    .get_mut(&appointment_id)
                    .ok_or_else(|| StoreError::Missing(format!("appointment {}", appointment_id)))?;
                if appointment.status != expected {
                    return Err(StoreError::PreconditionFailed(format!(
                        "appointment {} is {}, expected {}",
                        appointment_id, appointment.status, expected
                    )));
                }
                let previous = appointment.clone();
                appointment.status = status;
                Ok(Some(Undo::RestoreAppointment(previous)))
            }
        }
    }

    fn rollback(&mut self, undo_log: Vec<Undo>) {
        for undo in undo_log.into_iter().rev() {
            match undo {
                Undo::RemoveSlot(id) => {
                    self.slots.remove(&id);
                }
                Undo::RestoreSlot(slot) => {
                    self.slots.insert(slot.id, slot);
                }
                Undo::RemoveAppointment(id) => {
                    self.appointments.remove(&id);
                }
                Undo::RestoreAppointment(appointment) => {
                    self.appointments.insert(appointment.id, appointment);
                }
            }
        }
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables.doctors.values().cloned().collect();
        doctors.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str(), a.id)
                .cmp(&(b.last_name.as_str(), b.first_name.as_str(), b.id))
        });
        Ok(doctors)
    }

    async fn get_slot(&self, slot_id: Uuid) -> StoreResult<Option<AvailabilitySlot>> {
        Ok(self.tables.read().await.slots.get(&slot_id).cloned())
    }

    async fn doctor_slots(&self, doctor_id: Uuid) -> StoreResult<Vec<AvailabilitySlot>> {
        let tables = self.tables.read().await;
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .values()
            .filter(|slot| slot.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.start, slot.id));
        Ok(slots)
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn appointments(&self, doctor_id: Option<Uuid>) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|appointment| doctor_id.map_or(true, |id| appointment.doctor_id == id))
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| (appointment.start, appointment.created_at, appointment.id));
        Ok(appointments)
    }

    async fn apply(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let total = changes.len();
        let mut undo_log = Vec::with_capacity(total);

        for change in changes {
            match tables.apply_one(change) {
                Ok(Some(undo)) => undo_log.push(undo),
                Ok(None) => {}
                Err(err) => {
                    debug!("Rolling back change set after {} of {} changes: {}", undo_log.len(), total, err);
                    tables.rollback(undo_log);
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone, Utc};
    use shared_models::booking::{AppointmentMode, AppointmentStatus, TimeRange};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn slot(doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> AvailabilitySlot {
        AvailabilitySlot { id: Uuid::new_v4(), doctor_id, start, end, is_booked: false }
    }

    fn appointment(doctor_id: Uuid, slot: Option<&AvailabilitySlot>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_name: "Jane Roe".to_string(),
            patient_email: None,
            patient_phone: None,
            mode: if slot.is_some() { AppointmentMode::Availability } else { AppointmentMode::OnDemand },
            status: AppointmentStatus::Confirmed,
            availability_slot: slot.map(|s| s.id),
            start: slot.map_or(at(10, 0), |s| s.start),
            end: slot.map_or(at(10, 30), |s| s.end),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_slot_rejects_overlap_for_same_doctor_only() {
        let store = InMemoryBookingStore::new();
        let doctor = Uuid::new_v4();
        let other_doctor = Uuid::new_v4();

        store.apply(ChangeSet::new().insert_slot(slot(doctor, at(9, 0), at(9, 30)))).await.unwrap();

        let clash = store.apply(ChangeSet::new().insert_slot(slot(doctor, at(9, 15), at(9, 45)))).await;
        assert_matches!(clash, Err(StoreError::PreconditionFailed(_)));

        store.apply(ChangeSet::new().insert_slot(slot(doctor, at(9, 30), at(10, 0)))).await.unwrap();
        store.apply(ChangeSet::new().insert_slot(slot(other_doctor, at(9, 15), at(9, 45)))).await.unwrap();

        assert_eq!(store.doctor_slots(doctor).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_change_set_leaves_no_trace() {
        let store = InMemoryBookingStore::new();
        let doctor = Uuid::new_v4();
        let target = slot(doctor, at(9, 0), at(9, 30));
        store.apply(ChangeSet::new().insert_slot(target.clone())).await.unwrap();
        store.apply(ChangeSet::new().book_slot(target.id)).await.unwrap();

        // The appointment insert would succeed, but the slot is already booked.
        let first = appointment(doctor, Some(&target));
        let result = store
            .apply(ChangeSet::new().insert_appointment(first.clone()).book_slot(target.id))
            .await;

        assert_matches!(result, Err(StoreError::PreconditionFailed(_)));
        assert!(store.get_appointment(first.id).await.unwrap().is_none());
        assert!(store.get_slot(target.id).await.unwrap().unwrap().is_booked);
    }

    #[tokio::test]
    async fn test_cancel_and_release_commit_together() {
        let store = InMemoryBookingStore::new();
        let doctor = Uuid::new_v4();
        let target = slot(doctor, at(9, 0), at(9, 30));
        let booked = appointment(doctor, Some(&target));

        store
            .apply(ChangeSet::new().insert_slot(target.clone()).book_slot(target.id).insert_appointment(booked.clone()))
            .await
            .unwrap();

        store
            .apply(
                ChangeSet::new()
                    .set_status(booked.id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
                    .release_slot(target.id),
            )
            .await
            .unwrap();

        let stored = store.get_appointment(booked.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        assert!(!store.get_slot(target.id).await.unwrap().unwrap().is_booked);
    }

    #[tokio::test]
    async fn test_require_free_time_ignores_cancelled() {
        let store = InMemoryBookingStore::new();
        let doctor = Uuid::new_v4();
        let existing = appointment(doctor, None);
        store.apply(ChangeSet::new().insert_appointment(existing.clone())).await.unwrap();

        let range = TimeRange::new(at(10, 15), at(10, 45)).unwrap();
        let blocked = store.apply(ChangeSet::new().require_free_time(doctor, range)).await;
        assert_matches!(blocked, Err(StoreError::PreconditionFailed(_)));

        store
            .apply(ChangeSet::new().set_status(existing.id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled))
            .await
            .unwrap();

        store.apply(ChangeSet::new().require_free_time(doctor, range)).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_records_are_reported() {
        let store = InMemoryBookingStore::new();
        let result = store.apply(ChangeSet::new().release_slot(Uuid::new_v4())).await;
        assert_matches!(result, Err(StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_concurrent_book_slot_has_single_winner() {
        let store = std::sync::Arc::new(InMemoryBookingStore::new());
        let target = slot(Uuid::new_v4(), at(9, 0), at(9, 30));
        store.apply(ChangeSet::new().insert_slot(target.clone())).await.unwrap();

        let attempts = (0..8).map(|_| {
            let store = store.clone();
            let slot_id = target.id;
            tokio::spawn(async move { store.apply(ChangeSet::new().book_slot(slot_id)).await })
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results.into_iter().filter(|r| matches!(r, Ok(Ok(())))).count();
        assert_eq!(winners, 1);
    }
}
