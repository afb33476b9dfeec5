//! Submission storage contract.
//!
//! Every backend holds the whole collection in one slot and rewrites it on each mutation.
//! Updates run as in-place edits under the backend's write lock, so a guard evaluated
//! inside the edit always sees the latest record. Mutations are announced on a
//! [`ChangeFeed`] so open views can reload.

mod memory;
mod slot;

pub use memory::InMemorySubmissionStore;
pub use slot::JsonSlotStore;

use serde::Serialize;
use tokio::sync::broadcast;

use super::domain::{ComplaintId, Submission};

/// In-place edit of one record, run under the store's write lock.
///
/// Returning `false` discards the edit: nothing is written and no event is raised.
pub type Mutation<'a> = Box<dyn FnOnce(&mut Submission) -> bool + 'a>;

/// Storage abstraction shared by the intake, lookup, and review services.
pub trait SubmissionStore: Send + Sync {
    /// All records in insertion order.
    fn list(&self) -> Result<Vec<Submission>, StoreError>;
    fn create(&self, record: Submission) -> Result<Submission, StoreError>;
    /// Apply `mutation` to the record carrying `id` and return the record as stored.
    fn update(&self, id: &ComplaintId, mutation: Mutation<'_>) -> Result<Submission, StoreError>;
    /// Returns `false` when nothing carried the identifier.
    fn delete(&self, id: &ComplaintId) -> Result<bool, StoreError>;
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a submission with this reference already exists")]
    Conflict,
    #[error("submission not found")]
    NotFound,
    #[error("submission slot could not be written: {0}")]
    Io(#[from] std::io::Error),
    #[error("submission slot could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}

/// Notification raised after each state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    SubmissionCreated { id: ComplaintId },
    SubmissionUpdated { id: ComplaintId },
    SubmissionDeleted { id: ComplaintId },
    AdminSession { authenticated: bool },
}

const DEFAULT_FEED_CAPACITY: usize = 64;

/// Cloneable publish/subscribe handle. Publishing with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared create/update/delete rules applied to a loaded collection.
pub(crate) fn insert_record(
    records: &mut Vec<Submission>,
    record: &Submission,
) -> Result<(), StoreError> {
    if records.iter().any(|existing| existing.id == record.id) {
        return Err(StoreError::Conflict);
    }
    records.push(record.clone());
    Ok(())
}

/// Runs the mutation against the matching record; the flag reports whether it changed anything.
pub(crate) fn mutate_record(
    records: &mut [Submission],
    id: &ComplaintId,
    mutation: Mutation<'_>,
) -> Result<(Submission, bool), StoreError> {
    let slot = records
        .iter_mut()
        .find(|existing| &existing.id == id)
        .ok_or(StoreError::NotFound)?;
    let mut draft = slot.clone();
    let changed = mutation(&mut draft);
    if changed {
        *slot = draft;
    }
    Ok((slot.clone(), changed))
}

pub(crate) fn remove_record(records: &mut Vec<Submission>, id: &ComplaintId) -> bool {
    let before = records.len();
    records.retain(|existing| &existing.id != id);
    records.len() != before
}
