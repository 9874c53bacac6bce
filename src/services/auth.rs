use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::backend::token::{access_token, TokenOutcome};
use crate::session::keys;
use crate::state::AppState;
use crate::utils::respond::session_id;

pub const LOGIN_ROUTE: &str = "/admin-login";

/// Resolves a bearer token for the calling admin session or rejects with
/// the redirect-to-login instruction. Every admin handler goes through
/// here.
pub async fn admin_token(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, (StatusCode, Json<Value>)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "redirect": LOGIN_ROUTE })),
        )
    };
    let Some(sid) = session_id(headers) else {
        return Err(unauthorized());
    };
    match access_token(state.sessions.as_ref(), &sid, state.backend.as_ref()).await {
        Ok(TokenOutcome::Token(token)) => Ok(token),
        Ok(TokenOutcome::RedirectToLogin) => Err(unauthorized()),
        Err(e) => {
            error!("💥 Token lookup failed: {:?}", e);
            Err(unauthorized())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/admin/login — proxy the credential exchange and stash the
/// issued token pair under the session's auth keys.
pub async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let body = json!({ "username": request.username, "password": request.password });
    let response = match state.backend.post_json("/api/admin/login/", &body, None).await {
        Ok(response) => response,
        Err(e) => {
            let message = if e.to_string().starts_with("HTTP error!") {
                "Login failed".to_string()
            } else {
                e.to_string()
            };
            return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))));
        }
    };

    let sid = session_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    let store = state.sessions.as_ref();
    if let Some(access) = response.get("access").and_then(Value::as_str) {
        store
            .set(&sid, keys::ACCESS_TOKEN, json!(access))
            .await
            .map_err(crate::services::intake::internal)?;
    }
    if let Some(refresh) = response.get("refresh").and_then(Value::as_str) {
        store
            .set(&sid, keys::REFRESH_TOKEN, json!(refresh))
            .await
            .map_err(crate::services::intake::internal)?;
    }
    if let Some(user) = response.get("user").and_then(Value::as_str) {
        store
            .set(&sid, keys::USERNAME, json!(user))
            .await
            .map_err(crate::services::intake::internal)?;
    }

    info!("🔐 Admin login for session {}", sid);
    Ok(Json(json!({
        "session_id": sid,
        "message": response.get("message").cloned().unwrap_or(Value::Null),
        "user": response.get("user").cloned().unwrap_or(Value::Null),
    })))
}

/// POST /api/admin/logout — drop the stored token pair and username.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(sid) = session_id(&headers) {
        let store = state.sessions.as_ref();
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USERNAME] {
            store
                .remove(&sid, key)
                .await
                .map_err(crate::services::intake::internal)?;
        }
    }
    Ok(Json(json!({ "redirect": LOGIN_ROUTE })))
}
