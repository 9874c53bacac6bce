use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::session::{keys, SessionStore};

/// The one backend call the token helper makes. Behind a trait so tests
/// (and a future server-side validation) can swap the exchange out.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Value>;
}

/// What a caller should do with the access token it asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Token(String),
    /// No usable token and no way to mint one; the caller must abort and
    /// send the user to the login route.
    RedirectToLogin,
}

/// Expiry peek on the JWT payload, decoded without signature verification.
/// Verification stays on the backend; this only decides whether a refresh
/// round-trip is needed. Anything undecodable counts as expired.
pub fn is_token_expired(token: &str) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(decoded) = URL_SAFE_NO_PAD.decode(payload) else {
        return true;
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&decoded) else {
        return true;
    };
    match claims.get("exp").and_then(Value::as_i64) {
        Some(exp) => Utc::now().timestamp() > exp,
        None => true,
    }
}

/// Returns a bearer token for the session, refreshing it first when the
/// stored one is missing or expired. A fresh stored token costs zero
/// network calls; an expired one costs exactly one refresh exchange.
pub async fn access_token(
    store: &dyn SessionStore,
    session_id: &str,
    exchange: &dyn TokenExchange,
) -> Result<TokenOutcome> {
    let stored = store
        .get(session_id, keys::ACCESS_TOKEN)
        .await?
        .and_then(|v| v.as_str().map(str::to_string));

    if let Some(token) = stored {
        if !is_token_expired(&token) {
            return Ok(TokenOutcome::Token(token));
        }
    }

    let refresh_token = store
        .get(session_id, keys::REFRESH_TOKEN)
        .await?
        .and_then(|v| v.as_str().map(str::to_string));
    let Some(refresh_token) = refresh_token else {
        return Ok(TokenOutcome::RedirectToLogin);
    };

    let response = match exchange.refresh(&refresh_token).await {
        Ok(response) => response,
        Err(e) => {
            error!("❌ Token refresh failed: {}", e);
            return Ok(TokenOutcome::RedirectToLogin);
        }
    };

    match response.get("access").and_then(Value::as_str) {
        Some(access) => {
            info!("✅ Access token refreshed");
            store
                .set(session_id, keys::ACCESS_TOKEN, Value::String(access.to_string()))
                .await?;
            Ok(TokenOutcome::Token(access.to_string()))
        }
        None => Ok(TokenOutcome::RedirectToLogin),
    }
}
