use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::EventRecord;

struct Entry {
    record: Arc<EventRecord>,
    fetched_at: Instant,
}

/// Published event rows by id, kept for a fixed time so repeated downloads
/// of the same event do not hit the upstream table each time.
///
/// Expired rows are dropped lazily: lookups ignore them and the next insert
/// sweeps them out.
pub struct RecordCache {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl RecordCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            entries: Default::default(),
        }
    }

    /// A cache that never holds anything.
    pub fn disabled() -> Self {
        Self {
            ttl: None,
            entries: Default::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<EventRecord>> {
        let ttl = self.ttl?;

        let entries = self.entries.read().await;
        let entry = entries.get(id)?;
        if entry.fetched_at.elapsed() >= ttl {
            return None;
        }

        Some(Arc::clone(&entry.record))
    }

    /// Remembers `record` under `id`. Returns the shared row either way, so
    /// callers can use it without a second lookup.
    pub async fn insert(&self, id: &str, record: EventRecord) -> Arc<EventRecord> {
        let record = Arc::new(record);
        let Some(ttl) = self.ttl else {
            return record;
        };

        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        if entries.len() < before {
            debug!("Dropped {} expired events from cache", before - entries.len());
        }

        entries.insert(
            id.to_string(),
            Entry {
                record: Arc::clone(&record),
                fetched_at: Instant::now(),
            },
        );

        record
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
