//! In-memory document store
//!
//! Plays the role of the database emulator: same rule evaluation, same
//! precondition semantics, no persistence.

use async_trait::async_trait;
use ledger_core::{
    authorize_read, authorize_write, resolve_server_timestamps, DocPath, Document,
    DocumentLookup, Principal, Timestamp, WriteRequest,
};
use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;

use crate::document::{CommitResult, DocumentWrite, StoredDocument};
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Source of the store's notion of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for tests
#[derive(Debug)]
pub struct FixedClock {
    now: StdRwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: StdRwLock::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance_nanos(&self, nanos: i64) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = guard.shifted_nanos(nanos);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Rule lookups over stored state
struct Snapshot<'a>(&'a HashMap<DocPath, StoredDocument>);

impl DocumentLookup for Snapshot<'_> {
    fn lookup(&self, path: &DocPath) -> Option<&Document> {
        self.0.get(path).map(|stored| &stored.data)
    }
}

/// In-memory [`DocumentStore`]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<DocPath, StoredDocument>>,
    clock: Arc<dyn Clock>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Write without rule evaluation; for fixtures and migrations only.
    /// Server timestamp sentinels resolve to the clock's now.
    pub async fn seed(&self, path: DocPath, mut data: Document) -> u64 {
        let now = self.clock.now();
        resolve_server_timestamps(&mut data, now);

        let mut docs = self.docs.write().await;
        let stored = match docs.remove(&path) {
            Some(existing) => StoredDocument {
                data,
                version: existing.version + 1,
                update_time: now,
                ..existing
            },
            None => StoredDocument {
                path: path.clone(),
                data,
                version: 1,
                create_time: now,
                update_time: now,
            },
        };
        let version = stored.version;
        docs.insert(path, stored);
        version
    }

    /// Drop every document
    pub async fn clear(&self) {
        self.docs.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        auth: Option<&Principal>,
        path: &DocPath,
    ) -> StoreResult<Option<StoredDocument>> {
        let docs = self.docs.read().await;
        let existing = docs.get(path);
        if !authorize_read(auth, path, existing.map(|s| &s.data)).is_granted() {
            counter!("ledger_rule_denials_total", "collection" => path.collection.as_str())
                .increment(1);
            return Err(StoreError::PermissionDenied);
        }
        Ok(existing.cloned())
    }

    async fn commit(
        &self,
        auth: Option<&Principal>,
        writes: Vec<DocumentWrite>,
    ) -> StoreResult<CommitResult> {
        let mut docs = self.docs.write().await;
        let commit_time = self.clock.now();

        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(writes.len());

        for write in writes {
            if !seen.insert(write.path.clone()) {
                return Err(StoreError::Internal(format!(
                    "{} written twice in one batch",
                    write.path
                )));
            }

            let current = docs.get(&write.path);
            let current_version = current.map(|s| s.version);
            if !write.precondition.holds(current_version) {
                return Err(StoreError::conflict(
                    &write.path,
                    write.precondition.describe(),
                    current_version
                        .map(|v| format!("version {}", v))
                        .unwrap_or_else(|| "absent".to_string()),
                ));
            }

            let mut data = write.data;
            resolve_server_timestamps(&mut data, commit_time);

            let request = WriteRequest {
                principal: auth,
                path: &write.path,
                before: current.map(|s| &s.data),
                after: &data,
                request_time: commit_time,
            };
            if !authorize_write(&request, &Snapshot(&*docs)).is_granted() {
                counter!(
                    "ledger_rule_denials_total",
                    "collection" => write.path.collection.as_str()
                )
                .increment(1);
                return Err(StoreError::PermissionDenied);
            }

            let stored = match current {
                Some(existing) => StoredDocument {
                    path: write.path.clone(),
                    data,
                    version: existing.version + 1,
                    create_time: existing.create_time,
                    update_time: commit_time,
                },
                None => StoredDocument {
                    path: write.path.clone(),
                    data,
                    version: 1,
                    create_time: commit_time,
                    update_time: commit_time,
                },
            };
            staged.push(stored);
        }

        let versions = staged.iter().map(|s| s.version).collect();
        for stored in staged {
            tracing::trace!(path = %stored.path, version = stored.version, "document written");
            docs.insert(stored.path.clone(), stored);
        }

        Ok(CommitResult {
            commit_time,
            versions,
        })
    }
}


