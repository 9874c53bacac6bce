use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::{error, info};

use super::token::TokenExchange;

/// Thin wrapper over the remote seat-predictor backend. Centralizes the
/// base URL, bearer-token header injection and JSON/error unwrapping so no
/// call site talks to reqwest directly.
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        BackendClient {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get_json(&self, path: &str, token: Option<&str>) -> Result<Value> {
        let url = self.url(path);
        info!("Sending GET request to {}", url);
        let request = Self::with_bearer(self.http.get(&url), token);
        unwrap_json(request.send().await?).await
    }

    pub async fn post_json(&self, path: &str, payload: &Value, token: Option<&str>) -> Result<Value> {
        let url = self.url(path);
        info!("Sending POST request to {}", url);
        let request = Self::with_bearer(self.http.post(&url).json(payload), token);
        unwrap_json(request.send().await?).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: multipart::Form,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = self.url(path);
        info!("Sending multipart POST request to {}", url);
        let request = Self::with_bearer(self.http.post(&url).multipart(form), token);
        unwrap_json(request.send().await?).await
    }
}

/// Non-2xx responses become an error carrying the server-provided `detail`
/// or `message` when the body parses, else a generic HTTP-status message.
async fn unwrap_json(response: Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<Value>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    error!("❌ Error response: status={}, message={}", status, message);
    Err(anyhow!(message))
}

#[async_trait]
impl TokenExchange for BackendClient {
    async fn refresh(&self, refresh_token: &str) -> Result<Value> {
        self.post_json("/api/admin/refresh/", &json!({ "refresh": refresh_token }), None)
            .await
    }
}
