pub mod admin;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod proxy_routes;
pub mod proxy_service;
pub mod services;
pub mod state;

use axum::Router;

pub use state::AppState;

/// Merges the tenant-facing `/v1/...` surface with the operator-facing `/admin/...` surface into
/// one router, the way the teacher mounts its proxy and admin routers side by side.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(proxy_routes::proxy_router(state.clone()))
        .merge(admin::admin_router(state))
}
