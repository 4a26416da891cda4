// libs/doctor-cell/src/services/availability.rs

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{ChangeSet, DataContext, StoreError};
use shared_models::booking::{AvailabilitySlot, Session, TimeRange};
use shared_models::error::BookingError;

use crate::models::DailyGrid;

/// Source of truth for the time ranges a doctor has published as bookable.
///
/// Calendar-day matching is done in UTC: a slot belongs to the UTC date of its `start`.
pub struct AvailabilityRegistry {
    data: DataContext,
}

impl AvailabilityRegistry {
    pub fn new(data: &DataContext) -> Self {
        Self { data: data.clone() }
    }

    /// Slots of `doctor_id` starting on `date`, ascending by start.
    pub async fn list_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>, BookingError> {
        debug!("Listing slots for doctor {} on {}", doctor_id, date);

        self.ensure_doctor(doctor_id).await?;
        let slots = self.data.store.doctor_slots(doctor_id).await?;

        Ok(slots.into_iter().filter(|slot| slot.range().starts_on(date)).collect())
    }

    /// Unbooked slots of `doctor_id` starting in `[from, to)`.
    pub async fn open_slots_between(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, BookingError> {
        let slots = self.data.store.doctor_slots(doctor_id).await?;
        Ok(slots
            .into_iter()
            .filter(|slot| !slot.is_booked && slot.start >= from && slot.start < to)
            .collect())
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, BookingError> {
        self.data
            .store
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Availability slot {} not found", slot_id)))
    }

    pub async fn publish_slot(
        &self,
        session: &Session,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilitySlot, BookingError> {
        let range = TimeRange::new(start, end).ok_or_else(|| {
            BookingError::Validation("Invalid range: start time must be before end time".to_string())
        })?;
        ensure_can_manage(session, doctor_id)?;
        self.ensure_doctor(doctor_id).await?;

        let _guard = self.data.locks.acquire(doctor_id).await;

        let existing = self.data.store.doctor_slots(doctor_id).await?;
        if let Some(clash) = existing.iter().find(|slot| slot.range().overlaps(&range)) {
            warn!("Slot {} - {} for doctor {} overlaps slot {}", start, end, doctor_id, clash.id);
            return Err(BookingError::Conflict(format!(
                "Slot overlaps existing availability {} - {}",
                clash.start, clash.end
            )));
        }

        let slot = new_slot(doctor_id, range);
        self.data.store.apply(ChangeSet::new().insert_slot(slot.clone())).await?;

        info!("Published slot {} for doctor {} ({} - {})", slot.id, doctor_id, slot.start, slot.end);
        Ok(slot)
    }

    /// Generates consecutive `slot_minutes` slots between `day_start` and `day_end` on `date`.
    ///
    /// Candidates whose start already exists, or that would overlap an existing slot,
    /// are skipped, so repeating the call creates nothing. Only new slots are returned.
    pub async fn publish_daily_grid(
        &self,
        session: &Session,
        doctor_id: Uuid,
        grid: DailyGrid,
    ) -> Result<Vec<AvailabilitySlot>, BookingError> {
        if grid.slot_minutes <= 0 {
            return Err(BookingError::Validation("Slot length must be positive".to_string()));
        }
        if grid.day_start >= grid.day_end {
            return Err(BookingError::Validation("Day start must be before day end".to_string()));
        }
        if grid.slot_minutes > (grid.day_end - grid.day_start).num_minutes() {
            return Err(BookingError::Validation(
                "Slot length must fit between day start and day end".to_string(),
            ));
        }
        ensure_can_manage(session, doctor_id)?;
        self.ensure_doctor(doctor_id).await?;

        let _guard = self.data.locks.acquire(doctor_id).await;

        let existing = self.data.store.doctor_slots(doctor_id).await?;
        let candidates = grid_ranges(&grid);

        let mut created = Vec::new();
        let mut changes = ChangeSet::new();
        for range in candidates {
            let taken = existing
                .iter()
                .any(|slot| slot.start == range.start || slot.range().overlaps(&range));
            if taken {
                continue;
            }
            let slot = new_slot(doctor_id, range);
            changes = changes.insert_slot(slot.clone());
            created.push(slot);
        }

        if !changes.is_empty() {
            self.data.store.apply(changes).await?;
        }

        info!(
            "Generated {} slots for doctor {} on {} ({} min, {} - {})",
            created.len(), doctor_id, grid.date, grid.slot_minutes, grid.day_start, grid.day_end
        );
        Ok(created)
    }

    pub async fn retire_slot(&self, session: &Session, slot_id: Uuid) -> Result<(), BookingError> {
        let slot = self.get_slot(slot_id).await?;
        ensure_can_manage(session, slot.doctor_id)?;

        let _guard = self.data.locks.acquire(slot.doctor_id).await;

        if self.get_slot(slot_id).await?.is_booked {
            return Err(BookingError::Conflict(
                "Cannot delete a slot with a confirmed appointment".to_string(),
            ));
        }

        self.data.store.apply(ChangeSet::new().delete_unbooked_slot(slot_id)).await?;

        info!("Retired slot {} of doctor {}", slot_id, slot.doctor_id);
        Ok(())
    }

    /// Compare-and-set `is_booked` false -> true. Conflict if the slot is already booked.
    pub async fn mark_booked(&self, slot_id: Uuid) -> Result<AvailabilitySlot, BookingError> {
        self.get_slot(slot_id).await?;
        match self.data.store.apply(ChangeSet::new().book_slot(slot_id)).await {
            Ok(()) => self.get_slot(slot_id).await,
            Err(StoreError::PreconditionFailed(_)) => Err(BookingError::Conflict(format!(
                "Availability slot {} is already booked",
                slot_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Compare-and-set `is_booked` true -> false. Releasing a free slot is a no-op.
    pub async fn mark_released(&self, slot_id: Uuid) -> Result<AvailabilitySlot, BookingError> {
        let slot = self.get_slot(slot_id).await?;
        if !slot.is_booked {
            return Ok(slot);
        }
        self.data.store.apply(ChangeSet::new().release_slot(slot_id)).await?;
        self.get_slot(slot_id).await
    }

    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), BookingError> {
        match self.data.store.get_doctor(doctor_id).await? {
            Some(_) => Ok(()),
            None => Err(BookingError::NotFound(format!("Doctor {} not found", doctor_id))),
        }
    }
}

fn ensure_can_manage(session: &Session, doctor_id: Uuid) -> Result<(), BookingError> {
    if session.can_manage_doctor(doctor_id) {
        Ok(())
    } else {
        Err(BookingError::Forbidden(format!(
            "Not authorized to manage availability of doctor {}",
            doctor_id
        )))
    }
}

fn new_slot(doctor_id: Uuid, range: TimeRange) -> AvailabilitySlot {
    AvailabilitySlot {
        id: Uuid::new_v4(),
        doctor_id,
        start: range.start,
        end: range.end,
        is_booked: false,
    }
}

/// Whole slots only; a trailing remainder shorter than the slot length is dropped.
fn grid_ranges(grid: &DailyGrid) -> Vec<TimeRange> {
    let mut ranges = Vec::new();
    let Some(length) = TimeDelta::try_minutes(grid.slot_minutes) else {
        return ranges;
    };
    let day_end = grid.date.and_time(grid.day_end).and_utc();

    let mut cursor = grid.date.and_time(grid.day_start).and_utc();
    while let Some(next) = cursor.checked_add_signed(length).filter(|next| *next <= day_end) {
        if let Some(range) = TimeRange::new(cursor, next) {
            ranges.push(range);
        }
        cursor = next;
    }
    ranges
}
