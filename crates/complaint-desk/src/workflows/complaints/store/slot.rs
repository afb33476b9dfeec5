use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{
    insert_record, mutate_record, remove_record, ChangeEvent, ChangeFeed, Mutation, StoreError,
    SubmissionStore,
};
use crate::workflows::complaints::domain::{ComplaintId, Submission};

/// Single JSON file holding the entire collection, read and rewritten on every access.
///
/// A missing or unreadable slot is treated as an empty collection.
#[derive(Debug)]
pub struct JsonSlotStore {
    path: PathBuf,
    feed: ChangeFeed,
    write_lock: Mutex<()>,
}

impl JsonSlotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_feed(path, ChangeFeed::new())
    }

    pub fn with_feed(path: impl Into<PathBuf>, feed: ChangeFeed) -> Self {
        Self {
            path: path.into(),
            feed,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Vec<Submission> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "submission slot unreadable; treating as empty");
                return Vec::new();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }

        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "submission slot corrupt; treating as empty");
                Vec::new()
            }
        }
    }

    fn persist(&self, records: &[Submission]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_vec_pretty(records)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), records = records.len(), "submission slot written");
        Ok(())
    }

    /// Load, edit and rewrite the slot under the write lock. The slot is only rewritten
    /// when `apply` reports a change.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Vec<Submission>) -> Result<(T, bool), StoreError>,
    ) -> Result<(T, bool), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("slot lock poisoned".to_string()))?;
        let mut records = self.load();
        let (outcome, changed) = apply(&mut records)?;
        if changed {
            self.persist(&records)?;
        }
        Ok((outcome, changed))
    }
}

impl SubmissionStore for JsonSlotStore {
    fn list(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.load())
    }

    fn create(&self, record: Submission) -> Result<Submission, StoreError> {
        self.mutate(|records| insert_record(records, &record).map(|()| ((), true)))?;
        self.feed.publish(ChangeEvent::SubmissionCreated {
            id: record.id.clone(),
        });
        Ok(record)
    }

    fn update(&self, id: &ComplaintId, mutation: Mutation<'_>) -> Result<Submission, StoreError> {
        let (record, changed) = self.mutate(|records| mutate_record(records, id, mutation))?;
        if changed {
            self.feed.publish(ChangeEvent::SubmissionUpdated {
                id: record.id.clone(),
            });
        }
        Ok(record)
    }

    fn delete(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        let (removed, _) = self.mutate(|records| {
            let removed = remove_record(records, id);
            Ok((removed, removed))
        })?;
        if removed {
            self.feed
                .publish(ChangeEvent::SubmissionDeleted { id: id.clone() });
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
