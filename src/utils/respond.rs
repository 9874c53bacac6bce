use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

/// Header the browser carries instead of its tab-scoped session storage.
pub const SESSION_HEADER: &str = "x-session-id";

pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

/// Navigation answer: the view terminates and the client goes elsewhere.
/// Used for missing session data and failed auth, which navigate rather
/// than render a broken page.
pub fn redirect(route: &str) -> Json<Value> {
    Json(json!({ "redirect": route }))
}
