use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::backend::client::BackendClient;
use crate::config::AppConfig;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub backend: Arc<BackendClient>,
    pub shared_state: SharedState,
}

// Idle slots older than this are dropped once the map grows past the
// threshold; matches the default session TTL.
const SLOT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const SLOT_PRUNE_LEN: usize = 1024;

/// Update bookkeeping for one `{session}:{exam}` key: the latest issued
/// sequence, and a lock serializing the apply phase so an older response
/// can never overwrite a newer one's session writes.
struct UpdateSlot {
    issued: AtomicU64,
    committed: Arc<Mutex<u64>>,
    touched: StdMutex<Instant>,
}

impl UpdateSlot {
    fn new() -> Self {
        UpdateSlot {
            issued: AtomicU64::new(0),
            committed: Arc::new(Mutex::new(0)),
            touched: StdMutex::new(Instant::now()),
        }
    }
}

#[derive(Clone, Default)]
pub struct SharedState {
    update_slots: Arc<DashMap<String, Arc<UpdateSlot>>>,
    exports_in_flight: Arc<DashSet<String>>,
}

impl SharedState {
    fn slot(&self, key: &str) -> Arc<UpdateSlot> {
        self.update_slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(UpdateSlot::new()))
            .clone()
    }

    /// Issues the next update sequence for the key and returns it.
    pub fn issue_update_seq(&self, key: &str) -> u64 {
        if self.update_slots.len() > SLOT_PRUNE_LEN {
            self.prune_idle(SLOT_IDLE_TTL);
        }
        let slot = self.slot(key);
        if let Ok(mut touched) = slot.touched.lock() {
            *touched = Instant::now();
        }
        slot.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claims the right to apply the response for `seq`. `None` means the
    /// response is stale: a newer request was issued, or an equal-or-newer
    /// response was already applied. The claim holds a per-key lock for
    /// the duration of the session writes; call [`UpdateCommit::finish`]
    /// once they are stored.
    pub async fn commit_update(&self, key: &str, seq: u64) -> Option<UpdateCommit> {
        let slot = self.slot(key);
        let guard = slot.committed.clone().lock_owned().await;
        if seq != slot.issued.load(Ordering::SeqCst) || seq <= *guard {
            return None;
        }
        Some(UpdateCommit { seq, guard })
    }

    /// Drops update slots that have been idle longer than `idle`.
    pub fn prune_idle(&self, idle: Duration) {
        self.update_slots.retain(|_, slot| {
            slot.touched
                .lock()
                .map(|touched| touched.elapsed() < idle)
                .unwrap_or(false)
        });
    }

    /// Reserves the per-session CSV export slot; `None` while one is
    /// already running. The reservation is released when the guard drops,
    /// including when the request future is cancelled mid-export.
    pub fn begin_export(&self, session_id: &str) -> Option<ExportGuard> {
        if self.exports_in_flight.insert(session_id.to_string()) {
            Some(ExportGuard {
                exports: Arc::clone(&self.exports_in_flight),
                session_id: session_id.to_string(),
            })
        } else {
            None
        }
    }
}

pub struct UpdateCommit {
    seq: u64,
    guard: OwnedMutexGuard<u64>,
}

impl UpdateCommit {
    pub fn finish(mut self) {
        *self.guard = self.seq;
    }
}

pub struct ExportGuard {
    exports: Arc<DashSet<String>>,
    session_id: String,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.exports.remove(&self.session_id);
    }
}
