// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::booking::{Appointment, AppointmentStatus, Session, TimeRange};
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{
    AppointmentFilters, CancelAppointmentRequest, ConflictCheckQuery, CreateAppointmentRequest,
    DashboardQuery, UpdateStatusRequest,
};
use crate::services::{AppointmentBooker, ConflictDetectionService, DashboardService};

// ==============================================================================
// PUBLIC HANDLERS (PATIENT BOOKING FLOW)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let session = Session::Patient { email: request.patient_email.clone() };
    let appointment = booker.create_appointment(&session, request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let session = Session::Patient { email: Some(request.patient_email) };
    let appointment = booker
        .update_status(&session, appointment_id, AppointmentStatus::Cancelled)
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// DOCTOR PORTAL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(mut filters): Query<AppointmentFilters>,
) -> Result<Json<Value>, AppError> {
    match user.session() {
        Session::Admin => {}
        Session::Doctor(own_id) => match filters.doctor_id {
            Some(requested) if requested != own_id => {
                return Err(AppError::Forbidden(
                    "Doctors may only list their own appointments".to_string(),
                ))
            }
            _ => filters.doctor_id = Some(own_id),
        },
        Session::Patient { .. } => {
            return Err(AppError::Forbidden("Doctor or admin access required".to_string()))
        }
    }

    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let appointments = booker.list_appointments(&filters).await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let appointment = booker.get_appointment(appointment_id).await?;
    ensure_can_view(&user.session(), &appointment)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let appointment = booker
        .update_status(&user.session(), appointment_id, request.status)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.session().can_manage_doctor(query.doctor_id) {
        return Err(AppError::Forbidden(
            "Not authorized to inspect this doctor's calendar".to_string(),
        ));
    }
    let range = TimeRange::new(query.start, query.end).ok_or_else(|| {
        AppError::ValidationError("Invalid range: start time must be before end time".to_string())
    })?;

    let conflict_service = ConflictDetectionService::new(&state.data);
    let response = conflict_service
        .check_conflicts(query.doctor_id, range, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let session = user.session();
    let doctor_id = match (&session, query.doctor_id) {
        (_, Some(doctor_id)) => doctor_id,
        (Session::Doctor(own_id), None) => *own_id,
        _ => {
            return Err(AppError::ValidationError(
                "doctor query parameter is required".to_string(),
            ))
        }
    };
    if !session.can_manage_doctor(doctor_id) {
        return Err(AppError::Forbidden(
            "Not authorized to view this doctor's dashboard".to_string(),
        ));
    }

    let dashboard_service = DashboardService::new(&state.data);
    let dashboard = dashboard_service.dashboard(doctor_id, Utc::now()).await?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn reconcile_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booker = AppointmentBooker::new(&state.data, &state.config.booking_rules);
    let report = booker.reconcile_slots(&user.session(), doctor_id).await?;

    Ok(Json(json!(report)))
}

fn ensure_can_view(session: &Session, appointment: &Appointment) -> Result<(), AppError> {
    let allowed = match session {
        Session::Patient { email } => appointment.booked_by(email.as_deref()),
        _ => session.can_manage_doctor(appointment.doctor_id),
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to view this appointment".to_string()))
    }
}
