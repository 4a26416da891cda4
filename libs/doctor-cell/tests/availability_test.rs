// libs/doctor-cell/tests/availability_test.rs

use assert_matches::assert_matches;
use chrono::{Duration, NaiveTime};
use uuid::Uuid;

use doctor_cell::models::DailyGrid;
use doctor_cell::services::AvailabilityRegistry;
use shared_models::booking::Session;
use shared_models::error::BookingError;
use shared_utils::test_utils::{at, test_day, TestConfig, TestDoctors};

fn registry_with_doctor() -> (AvailabilityRegistry, Uuid) {
    let doctor = TestDoctors::cardiologist();
    let doctor_id = doctor.id;
    let state = TestConfig::default().to_state_with(vec![doctor]);
    (AvailabilityRegistry::new(&state.data), doctor_id)
}

fn working_day() -> DailyGrid {
    DailyGrid {
        date: test_day(),
        slot_minutes: 30,
        day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_publish_and_list_slots_in_start_order() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    registry.publish_slot(&session, doctor_id, at(11, 0), at(11, 30)).await.unwrap();
    registry.publish_slot(&session, doctor_id, at(9, 0), at(9, 30)).await.unwrap();
    // Next day, must not show up
    registry
        .publish_slot(&session, doctor_id, at(9, 0) + Duration::days(1), at(9, 30) + Duration::days(1))
        .await
        .unwrap();

    let slots = registry.list_slots(doctor_id, test_day()).await.unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, at(9, 0));
    assert_eq!(slots[1].start, at(11, 0));
    assert!(slots.iter().all(|slot| !slot.is_booked));
}

#[tokio::test]
async fn test_list_slots_for_unknown_doctor_is_not_found() {
    let (registry, _) = registry_with_doctor();
    let result = registry.list_slots(Uuid::new_v4(), test_day()).await;
    assert_matches!(result, Err(BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_list_slots_empty_day() {
    let (registry, doctor_id) = registry_with_doctor();
    assert!(registry.list_slots(doctor_id, test_day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_rejects_inverted_range() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    let equal = registry.publish_slot(&session, doctor_id, at(9, 0), at(9, 0)).await;
    assert_matches!(equal, Err(BookingError::Validation(_)));

    let inverted = registry.publish_slot(&session, doctor_id, at(10, 0), at(9, 0)).await;
    assert_matches!(inverted, Err(BookingError::Validation(_)));
}

#[tokio::test]
async fn test_publish_rejects_overlap_but_allows_back_to_back() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    registry.publish_slot(&session, doctor_id, at(9, 0), at(9, 30)).await.unwrap();

    let overlapping = registry.publish_slot(&session, doctor_id, at(9, 15), at(9, 45)).await;
    assert_matches!(overlapping, Err(BookingError::Conflict(_)));

    registry.publish_slot(&session, doctor_id, at(9, 30), at(10, 0)).await.unwrap();
}

#[tokio::test]
async fn test_other_doctor_cannot_publish() {
    let (registry, doctor_id) = registry_with_doctor();

    let result = registry
        .publish_slot(&Session::Doctor(Uuid::new_v4()), doctor_id, at(9, 0), at(9, 30))
        .await;
    assert_matches!(result, Err(BookingError::Forbidden(_)));

    let patient = Session::Patient { email: Some("p@example.com".to_string()) };
    let result = registry.publish_slot(&patient, doctor_id, at(9, 0), at(9, 30)).await;
    assert_matches!(result, Err(BookingError::Forbidden(_)));

    registry.publish_slot(&Session::Admin, doctor_id, at(9, 0), at(9, 30)).await.unwrap();
}

#[tokio::test]
async fn test_daily_grid_is_idempotent() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    let first = registry.publish_daily_grid(&session, doctor_id, working_day()).await.unwrap();
    assert_eq!(first.len(), 16);
    assert!(first.windows(2).all(|w| w[0].start < w[1].start));

    let second = registry.publish_daily_grid(&session, doctor_id, working_day()).await.unwrap();
    assert!(second.is_empty());

    assert_eq!(registry.list_slots(doctor_id, test_day()).await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_daily_grid_fills_around_existing_slots() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    registry.publish_slot(&session, doctor_id, at(9, 0), at(9, 30)).await.unwrap();
    // Off-grid slot covering part of 10:00-10:30 and 10:30-11:00
    registry.publish_slot(&session, doctor_id, at(10, 15), at(10, 45)).await.unwrap();

    let created = registry.publish_daily_grid(&session, doctor_id, working_day()).await.unwrap();
    assert_eq!(created.len(), 13);
    assert!(created.iter().all(|slot| slot.start != at(9, 0)));
    assert!(created.iter().all(|slot| slot.start != at(10, 0) && slot.start != at(10, 30)));

    assert_eq!(registry.list_slots(doctor_id, test_day()).await.unwrap().len(), 15);
}

#[tokio::test]
async fn test_daily_grid_validates_parameters() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    let zero = DailyGrid { slot_minutes: 0, ..working_day() };
    assert_matches!(
        registry.publish_daily_grid(&session, doctor_id, zero).await,
        Err(BookingError::Validation(_))
    );

    let inverted = DailyGrid {
        day_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        day_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        ..working_day()
    };
    assert_matches!(
        registry.publish_daily_grid(&session, doctor_id, inverted).await,
        Err(BookingError::Validation(_))
    );
}

#[tokio::test]
async fn test_daily_grid_rejects_slot_longer_than_day() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    let huge = DailyGrid { slot_minutes: 10_000_000_000_000, ..working_day() };
    assert_matches!(
        registry.publish_daily_grid(&session, doctor_id, huge).await,
        Err(BookingError::Validation(_))
    );

    let one_past_span = DailyGrid { slot_minutes: 8 * 60 + 1, ..working_day() };
    assert_matches!(
        registry.publish_daily_grid(&session, doctor_id, one_past_span).await,
        Err(BookingError::Validation(_))
    );

    // The whole working day as a single slot is still allowed
    let whole_day = DailyGrid { slot_minutes: 8 * 60, ..working_day() };
    let created = registry.publish_daily_grid(&session, doctor_id, whole_day).await.unwrap();
    assert_eq!(created.len(), 1);

    // The lock was released, later writes still go through
    assert!(registry.list_slots(doctor_id, test_day()).await.is_ok());
}

#[tokio::test]
async fn test_mark_booked_is_compare_and_set() {
    let (registry, doctor_id) = registry_with_doctor();
    let slot = registry
        .publish_slot(&Session::Doctor(doctor_id), doctor_id, at(9, 0), at(9, 30))
        .await
        .unwrap();

    let booked = registry.mark_booked(slot.id).await.unwrap();
    assert!(booked.is_booked);

    assert_matches!(registry.mark_booked(slot.id).await, Err(BookingError::Conflict(_)));

    let released = registry.mark_released(slot.id).await.unwrap();
    assert!(!released.is_booked);
    registry.mark_booked(slot.id).await.unwrap();

    assert_matches!(registry.mark_booked(Uuid::new_v4()).await, Err(BookingError::NotFound(_)));
    assert_matches!(registry.mark_released(Uuid::new_v4()).await, Err(BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_mark_booked_single_winner() {
    let (registry, doctor_id) = registry_with_doctor();
    let slot = registry
        .publish_slot(&Session::Doctor(doctor_id), doctor_id, at(9, 0), at(9, 30))
        .await
        .unwrap();

    let attempts = (0..10).map(|_| registry.mark_booked(slot.id));
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, BookingError::Conflict(_))));
}

#[tokio::test]
async fn test_retire_slot() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    let free = registry.publish_slot(&session, doctor_id, at(9, 0), at(9, 30)).await.unwrap();
    let taken = registry.publish_slot(&session, doctor_id, at(10, 0), at(10, 30)).await.unwrap();
    registry.mark_booked(taken.id).await.unwrap();

    assert_matches!(
        registry.retire_slot(&session, taken.id).await,
        Err(BookingError::Conflict(msg)) if msg.contains("confirmed appointment")
    );
    assert_matches!(
        registry.retire_slot(&Session::Doctor(Uuid::new_v4()), free.id).await,
        Err(BookingError::Forbidden(_))
    );

    registry.retire_slot(&session, free.id).await.unwrap();
    assert_matches!(registry.get_slot(free.id).await, Err(BookingError::NotFound(_)));
    assert_matches!(registry.retire_slot(&session, free.id).await, Err(BookingError::NotFound(_)));

    let remaining = registry.list_slots(doctor_id, test_day()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, taken.id);
}

#[tokio::test]
async fn test_open_slots_between() {
    let (registry, doctor_id) = registry_with_doctor();
    let session = Session::Doctor(doctor_id);

    registry.publish_daily_grid(&session, doctor_id, working_day()).await.unwrap();
    let slots = registry.list_slots(doctor_id, test_day()).await.unwrap();
    registry.mark_booked(slots[0].id).await.unwrap();

    let open = registry.open_slots_between(doctor_id, at(9, 0), at(10, 0)).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].start, at(9, 30));
}
