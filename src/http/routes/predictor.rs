use crate::services::intake::{handle_options, handle_submit};
use crate::services::results::{handle_email, handle_export, handle_results, handle_update};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/predictor/:exam/options", get(handle_options))
        .route("/predictor/:exam/submit", post(handle_submit))
        .route("/predictor/:exam/results", get(handle_results))
        .route("/predictor/:exam/update", post(handle_update))
        .route("/predictor/:exam/export", get(handle_export))
        .route("/predictor/:exam/email", post(handle_email))
        .with_state(app_state)
}
