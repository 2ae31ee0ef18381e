use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{channels, control, handlers, jobs, middleware::metrics_middleware, records, search};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and stats
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/stats", get(records::get_stats))
        // Indexing jobs
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/start", post(jobs::start_job))
        .route("/jobs/{id}/pause", post(jobs::pause_job))
        .route("/jobs/{id}/resume", post(jobs::resume_job))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
        .route("/jobs/{id}/skip", put(jobs::set_skip))
        // Search
        .route("/search", get(search::search))
        .route("/search/seasons", get(search::seasons))
        .route("/search/episodes", get(search::episodes))
        // Records
        .route("/records/{fingerprint}", get(records::get_record))
        .route("/records/link/{token}", get(records::get_record_by_link))
        .route(
            "/records/by-source/{channel}/{message}",
            get(records::get_record_by_source),
        )
        // Channels
        .route("/channels", get(channels::list_channels))
        .route("/channels/{id}/messages", post(channels::post_message))
        // Toggles
        .route(
            "/publisher",
            get(control::get_publisher).put(control::update_publisher),
        )
        .route(
            "/maintenance",
            get(control::get_maintenance).put(control::set_maintenance),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
