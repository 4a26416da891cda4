use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    // Patients browse doctors and open slots without logging in
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/availability", get(handlers::list_slots));

    let protected_routes = Router::new()
        .route("/{doctor_id}/availability", post(handlers::publish_slot))
        .route("/{doctor_id}/availability/grid", post(handlers::publish_daily_grid))
        .route("/{doctor_id}/availability/{slot_id}", delete(handlers::retire_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
