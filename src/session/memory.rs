use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

use super::SessionStore;

/// In-process session store over a DashMap. Entries expire lazily on read;
/// the default for development and the substitute tests inject.
pub struct MemoryStore {
    entries: DashMap<(String, String), (Value, Instant)>,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new(ttl_secs: u64) -> Self {
        MemoryStore {
            entries: DashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>> {
        let map_key = (session_id.to_string(), key.to_string());
        let expired = match self.entries.get(&map_key) {
            Some(entry) => {
                let (value, written_at) = entry.value();
                if written_at.elapsed() < self.ttl {
                    return Ok(Some(value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(&map_key);
        }
        Ok(None)
    }

    async fn set(&self, session_id: &str, key: &str, value: Value) -> Result<()> {
        // Sweep on write so abandoned sessions do not pile up.
        self.entries.retain(|_, entry| entry.1.elapsed() < self.ttl);
        self.entries.insert(
            (session_id.to_string(), key.to_string()),
            (value, Instant::now()),
        );
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<()> {
        self.entries
            .remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }
}
