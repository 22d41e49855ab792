pub mod admin;
pub mod adventures;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /admin/jobs                          worker stats and control (admin only)
///
/// /adventures/{id}/prompt              assembled system prompt
/// /adventures/{id}/turns               turn enrichment
/// /adventures/{id}/state               current character state
/// /adventures/{id}/state/preview       dry-run merge
/// /adventures/{id}/state/{domain}      manual trait edit
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/adventures", adventures::router())
}
