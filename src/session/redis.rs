use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::error;

use super::SessionStore;

/// Redis-backed session store for multi-instance deployments. Values are
/// JSON strings under `session:{id}:{key}` with a per-write TTL.
pub struct RedisStore {
    pool: Pool,
    ttl_secs: u64,
}

impl RedisStore {
    pub fn new(pool: Pool, ttl_secs: u64) -> Self {
        RedisStore { pool, ttl_secs }
    }

    fn redis_key(session_id: &str, key: &str) -> String {
        format!("session:{}:{}", session_id, key)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>> {
        let mut conn = self.pool.get().await.map_err(|e| anyhow!("redis pool: {e}"))?;
        let raw: Option<String> = conn.get(Self::redis_key(session_id, key)).await?;
        match raw {
            Some(data) => match serde_json::from_str(&data) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    error!("❌ Failed to parse session value for key {}: {:?}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, session_id: &str, key: &str, value: Value) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| anyhow!("redis pool: {e}"))?;
        conn.set_ex::<_, _, ()>(
            Self::redis_key(session_id, key),
            value.to_string(),
            self.ttl_secs,
        )
        .await?;
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| anyhow!("redis pool: {e}"))?;
        conn.del::<_, ()>(Self::redis_key(session_id, key)).await?;
        Ok(())
    }
}
