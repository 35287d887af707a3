use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::common::{
    IdentityKey, NftAsset, ProcessingRecord, ProcessingState, TransferEvent,
};
use crate::models::errors::Stage;

/// Admits each distinct (contract, token id) transfer exactly once, no matter
/// which source reported it or how many times. This is the single guarantee
/// that prevents double-printing and double-burning.
///
/// The map is the only mutable state shared between the two ingress adapters.
/// Admission is one atomic check-and-insert under the lock; the lock is never
/// held across an await point. Records live for the process lifetime.
#[derive(Default)]
pub struct DedupGate {
    records: Mutex<HashMap<IdentityKey, ProcessingRecord>>,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and creates a `Pending` record the first time a key is
    /// presented; false with no side effect on every later presentation.
    pub fn admit(&self, event: &TransferEvent) -> bool {
        let key = event.key();
        let mut records = self.records.lock().unwrap();
        match records.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(ProcessingRecord::new(key));
                true
            }
        }
    }

    /// Snapshot a record at the start of a workflow attempt, incrementing its
    /// attempt counter. Creates a `Pending` record for a key invoked directly
    /// without prior admission.
    pub fn begin_attempt(&self, key: IdentityKey) -> ProcessingRecord {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(key)
            .or_insert_with(|| ProcessingRecord::new(key));
        record.attempts += 1;
        record.clone()
    }

    /// Advance a record to a new checkpoint, merging any newly resolved asset
    /// fields and clearing the last error.
    pub fn advance(&self, key: IdentityKey, state: ProcessingState, asset: &NftAsset) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&key) {
            record.state = state;
            record.asset = asset.clone();
            record.last_error = None;
        }
    }

    /// Attach the failing stage to the record without moving its checkpoint,
    /// so a retry resumes where the last attempt left off.
    pub fn record_failure(&self, key: IdentityKey, stage: Stage, message: String) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&key) {
            record.last_error = Some(crate::models::common::StageFailure { stage, message });
        }
    }

    pub fn snapshot(&self, key: &IdentityKey) -> Option<ProcessingRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }
}
