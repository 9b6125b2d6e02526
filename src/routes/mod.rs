pub mod ctc;
pub mod health;
pub mod workflow;

use crate::middleware::{
    auth::{require_admin, require_hr_or_admin},
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(state: AppState, rps: u32) -> Router {
    let hr_api = Router::new()
        .route(
            "/api/workflow/candidates/:id/applications",
            post(workflow::start_application),
        )
        .route("/api/workflow/candidates/:id/advance", post(workflow::advance))
        .route("/api/workflow/candidates/:id/pause", post(workflow::pause))
        .route("/api/workflow/candidates/:id/resume", post(workflow::resume))
        .route("/api/workflow/candidates/:id/evaluate", post(workflow::evaluate))
        .route("/api/workflow/candidates/:id/workflow", get(workflow::history))
        .route("/api/workflow/candidates/:id/ctc", get(ctc::get_for_candidate))
        .route(
            "/api/workflow/interviews/:id/process",
            post(workflow::process_interview),
        )
        .route(
            "/api/workflow/actions/:log_id/complete",
            post(workflow::complete_action),
        )
        .route("/api/workflow/pending-actions", get(workflow::pending_actions))
        .route("/api/workflow/status", get(workflow::status_summary))
        .route("/api/ctc", post(ctc::start))
        .route("/api/ctc/:id", get(ctc::get).patch(ctc::update))
        .route("/api/ctc/:id/compare-benchmark", post(ctc::compare_benchmark))
        .route("/api/ctc/:id/generate-breakdown", post(ctc::generate_breakdown))
        .route("/api/ctc/:id/validate", get(ctc::validate))
        .route("/api/ctc/:id/finalize", post(ctc::finalize))
        .route("/api/ctc/:id/response", post(ctc::record_response))
        .route("/api/ctc/:id/cancel", post(ctc::cancel))
        .route_layer(from_fn_with_state(state.clone(), require_hr_or_admin));

    let admin_api = Router::new()
        .route(
            "/api/workflow/config",
            get(workflow::get_policy).put(workflow::upsert_policy),
        )
        .route("/api/workflow/config/policies", get(workflow::list_policies))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let api = hr_api
        .merge(admin_api)
        .layer(from_fn_with_state(RateLimiter::new(rps), rps_middleware));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
