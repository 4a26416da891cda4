// libs/doctor-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{DailyGridRequest, DoctorFilters, PublishSlotRequest, SlotQuery};
use crate::services::{AvailabilityRegistry, DoctorDirectory};

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    Query(filters): Query<DoctorFilters>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectory::new(&state.data);
    let doctors = directory.list_doctors(&filters).await?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectory::new(&state.data);
    let doctor = directory.get_doctor(doctor_id).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let registry = AvailabilityRegistry::new(&state.data);
    let slots = registry.list_slots(doctor_id, query.date).await?;

    Ok(Json(json!(slots)))
}

// ==============================================================================
// DOCTOR PORTAL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn publish_slot(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<PublishSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registry = AvailabilityRegistry::new(&state.data);
    let slot = registry
        .publish_slot(&user.session(), doctor_id, request.start, request.end)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(slot))))
}

#[axum::debug_handler]
pub async fn publish_daily_grid(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<DailyGridRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registry = AvailabilityRegistry::new(&state.data);
    let grid = request.resolve(&state.config.booking_rules);
    let created = registry.publish_daily_grid(&user.session(), doctor_id, grid).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "created": created.len(),
            "slots": created,
        })),
    ))
}

#[axum::debug_handler]
pub async fn retire_slot(
    State(state): State<AppState>,
    Path((doctor_id, slot_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    let registry = AvailabilityRegistry::new(&state.data);

    let slot = registry.get_slot(slot_id).await?;
    if slot.doctor_id != doctor_id {
        return Err(AppError::NotFound(format!(
            "Availability slot {} not found for doctor {}",
            slot_id, doctor_id
        )));
    }

    registry.retire_slot(&user.session(), slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
