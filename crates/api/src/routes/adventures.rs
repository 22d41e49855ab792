//! Route definitions for `/adventures`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::adventures;
use crate::state::AppState;

/// Routes mounted at `/adventures`.
///
/// ```text
/// GET    /{id}/prompt              -> get_prompt
/// POST   /{id}/turns               -> process_turn
/// GET    /{id}/state               -> get_state
/// POST   /{id}/state/preview       -> preview_state
/// PUT    /{id}/state/{domain}      -> update_domain
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/prompt", get(adventures::get_prompt))
        .route("/{id}/turns", post(adventures::process_turn))
        .route("/{id}/state", get(adventures::get_state))
        .route("/{id}/state/preview", post(adventures::preview_state))
        .route("/{id}/state/{domain}", put(adventures::update_domain))
}
