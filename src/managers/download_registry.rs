//! Download Registry for the browser shell.
//!
//! In-memory map of download id to record, plus id allocation. Ids come from a
//! process-wide counter starting at 1 and are never reused, not even after
//! [`DownloadRegistry::cleanup`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::download::{DownloadRecord, DownloadStatus};

#[derive(Debug)]
struct RegistryState {
    next_id: u64,
    // Ids are allocated in increasing order, so key order is insertion order.
    records: BTreeMap<u64, DownloadRecord>,
}

/// Owner of every download record in the process.
#[derive(Debug)]
pub struct DownloadRegistry {
    state: Mutex<RegistryState>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Records stay consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the next unused id.
    pub fn allocate(&self) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    pub fn insert(&self, record: DownloadRecord) {
        self.lock().records.insert(record.id, record);
    }

    pub fn get(&self, id: u64) -> Option<DownloadRecord> {
        self.lock().records.get(&id).cloned()
    }

    /// Snapshot of all records in insertion order.
    pub fn list(&self) -> Vec<DownloadRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Runs `f` on the record with the registry locked.
    ///
    /// Returns `None` when the id is unknown.
    pub fn with_record<R>(&self, id: u64, f: impl FnOnce(&mut DownloadRecord) -> R) -> Option<R> {
        self.lock().records.get_mut(&id).map(f)
    }

    /// Calls `abort` for every downloading record, then drops all records.
    ///
    /// The id counter keeps its value.
    pub fn cleanup(&self, mut abort: impl FnMut(&DownloadRecord)) {
        let mut state = self.lock();
        for record in state.records.values() {
            if record.status == DownloadStatus::Downloading {
                abort(record);
            }
        }
        state.records.clear();
    }
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
