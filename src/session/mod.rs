pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Storage keys the pages hand data off through. The names are part of the
/// wire contract: old clients stored exactly these in the browser session.
pub mod keys {
    pub const PREDICTOR_DATA: &str = "predictorData";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USERNAME: &str = "username";
}

/// Per-visitor key-value store standing in for the browser's session
/// storage. Values are JSON; every write carries the configured TTL so
/// abandoned sessions age out.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>>;
    async fn set(&self, session_id: &str, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, session_id: &str, key: &str) -> Result<()>;
}

/// Typed read over the JSON store. A present-but-malformed value reads as
/// absent; the stored blob is the other side's to evolve.
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn SessionStore,
    session_id: &str,
    key: &str,
) -> Result<Option<T>> {
    let value = store.get(session_id, key).await?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

pub async fn set_typed<T: Serialize>(
    store: &dyn SessionStore,
    session_id: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    store
        .set(session_id, key, serde_json::to_value(value)?)
        .await
}
