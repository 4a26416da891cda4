// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // Patients book and cancel with the email they booked under, no account needed
    let public_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment));

    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/conflicts/check", get(handlers::check_conflicts))
        .route("/dashboard", get(handlers::doctor_dashboard))
        .route("/reconcile/{doctor_id}", post(handlers::reconcile_slots))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
