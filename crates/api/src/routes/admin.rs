//! Route definitions for `/admin` (admin role required).

use axum::routing::get;
use axum::Router;

use crate::handlers::admin_jobs;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /jobs?action=stats|next-job    -> get_jobs
/// POST   /jobs                          -> post_jobs
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/jobs",
        get(admin_jobs::get_jobs).post(admin_jobs::post_jobs),
    )
}
