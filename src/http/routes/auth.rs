use crate::services::auth::{handle_login, handle_logout};
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/admin/login", post(handle_login))
        .route("/admin/logout", post(handle_logout))
        .with_state(app_state)
}
