use crate::services::dashboard::handle_stats;
use crate::services::settings;
use crate::services::upload;
use crate::services::user_searches;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/admin/dashboard/stats", get(handle_stats))
        .route("/admin/user-searches", get(user_searches::handle_list))
        .route("/admin/user-searches/export", post(user_searches::handle_export))
        .route("/admin/user-searches/analytics", get(user_searches::handle_analytics))
        .route("/admin/upload", post(upload::handle_upload))
        .route("/admin/upload/history", get(upload::handle_history))
        .route("/admin/upload/error-report", post(upload::handle_error_report))
        .route("/admin/settings", get(settings::handle_get))
        .route("/admin/settings/active-year", post(settings::handle_set_active_year))
        .route("/admin/settings/update", post(settings::handle_update))
        .route("/admin/settings/reset", post(settings::handle_reset))
        .with_state(app_state)
}
