use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::{
    insert_record, mutate_record, remove_record, ChangeEvent, ChangeFeed, Mutation, StoreError,
    SubmissionStore,
};
use crate::workflows::complaints::domain::{ComplaintId, Submission};

/// Process-local store; the collection lives for as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubmissionStore {
    records: Arc<Mutex<Vec<Submission>>>,
    feed: ChangeFeed,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            records: Arc::default(),
            feed,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Submission>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("submission mutex poisoned".to_string()))
    }
}

impl SubmissionStore for InMemorySubmissionStore {
    fn list(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn create(&self, record: Submission) -> Result<Submission, StoreError> {
        insert_record(&mut *self.lock()?, &record)?;
        self.feed.publish(ChangeEvent::SubmissionCreated {
            id: record.id.clone(),
        });
        Ok(record)
    }

    fn update(&self, id: &ComplaintId, mutation: Mutation<'_>) -> Result<Submission, StoreError> {
        let (record, changed) = mutate_record(&mut *self.lock()?, id, mutation)?;
        if changed {
            self.feed.publish(ChangeEvent::SubmissionUpdated {
                id: record.id.clone(),
            });
        }
        Ok(record)
    }

    fn delete(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        let removed = remove_record(&mut *self.lock()?, id);
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
