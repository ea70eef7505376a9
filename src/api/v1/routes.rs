/*
 * Responsibility
 * - URL layout of v1
 * - the gate itself is installed once for the whole app (app.rs)
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{me::me, users::get_user};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/users/{username}", get(get_user))
}
