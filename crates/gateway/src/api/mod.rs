pub mod alerts;
pub mod auth;
pub mod budget;
pub mod error;
pub mod guard;
pub mod health;
pub mod settings;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth) and **protected** (API token
/// middleware). Settings writes additionally require the admin token via the
/// [`auth::AdminGuard`] extractor.
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health::health));

    let protected = Router::new()
        // Budget + guard
        .route("/v1/projects/:id/budget", get(budget::get_budget))
        .route("/v1/projects/:id/guard", get(guard::get_guard))
        .route("/v1/projects/:id/guard/evaluate", post(guard::evaluate))
        // Alerts
        .route("/v1/projects/:id/alerts/downgrade", post(alerts::downgrade_applied))
        .route("/v1/projects/:id/alerts/abort", post(alerts::operation_aborted))
        .route("/v1/alerts", get(alerts::list_alerts))
        // Admin
        .route("/v1/projects/:id/settings", put(settings::update_settings))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}
