use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::models::admin::SystemSettings;
use crate::services::auth::admin_token;
use crate::state::AppState;
use crate::utils::respond::reject;

/// GET /api/admin/settings — current system settings from the backend,
/// fields defaulting to the baseline when the payload is sparse.
pub async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SystemSettings>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;
    let response = state
        .backend
        .get_json("/api/admin/settings/", Some(&token))
        .await
        .map_err(|e| {
            error!("❌ Failed to load settings: {}", e);
            reject(StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    let mut settings = SystemSettings::default();
    if let Some(year) = response.get("neet_pg_active_year").and_then(Value::as_u64) {
        settings.neet_pg_active_year = year as u16;
    }
    if let Some(year) = response.get("neet_ss_active_year").and_then(Value::as_u64) {
        settings.neet_ss_active_year = year as u16;
    }
    if let Some(priority) = response.get("data_source_priority").and_then(Value::as_str) {
        settings.data_source_priority = priority.to_string();
    }
    if let Some(backup) = response.get("automatic_backup").and_then(Value::as_bool) {
        settings.automatic_backup = backup;
    }
    if let Some(emails) = response.get("email_notifications").and_then(Value::as_bool) {
        settings.email_notifications = emails;
    }
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct ActiveYearRequest {
    pub exam_type: String,
    pub year: u16,
}

/// POST /api/admin/settings/active-year — persist the single active year
/// for one exam type.
pub async fn handle_set_active_year(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ActiveYearRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;

    // Validate the exam type against the model before going upstream.
    let mut probe = SystemSettings::default();
    if !probe.set_active_year(&request.exam_type, request.year) {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Unknown exam type: {}", request.exam_type),
        ));
    }

    let body = json!({ "exam_type": request.exam_type, "year": request.year });
    match state
        .backend
        .post_json("/api/admin/settings/set-active-year/", &body, Some(&token))
        .await
    {
        Ok(response) => {
            info!("⚙️ Active year for {} set to {}", request.exam_type, request.year);
            Ok(Json(response))
        }
        Err(e) => Err(reject(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub data_source_priority: Option<String>,
    #[serde(default)]
    pub automatic_backup: Option<bool>,
    #[serde(default)]
    pub email_notifications: Option<bool>,
}

/// POST /api/admin/settings/update — persist priority/toggle changes.
pub async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;
    let mut body = json!({});
    if let Some(priority) = request.data_source_priority {
        body["data_source_priority"] = json!(priority);
    }
    if let Some(backup) = request.automatic_backup {
        body["automatic_backup"] = json!(backup);
    }
    if let Some(emails) = request.email_notifications {
        body["email_notifications"] = json!(emails);
    }

    match state
        .backend
        .post_json("/api/admin/settings/update/", &body, Some(&token))
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(reject(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

/// POST /api/admin/settings/reset — the fixed baseline, no network call.
pub async fn handle_reset() -> Json<SystemSettings> {
    Json(SystemSettings::default())
}
