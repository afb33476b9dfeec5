use complaint_desk::config::StorageConfig;
use complaint_desk::workflows::complaints::{
    ChangeEvent, ChangeFeed, ComplaintId, InMemorySubmissionStore, JsonSlotStore, Mutation,
    StoreError, Submission, SubmissionStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Storage selected at startup: a slot file when one is configured, memory otherwise.
pub(crate) enum StoreBackend {
    Memory(InMemorySubmissionStore),
    Slot(JsonSlotStore),
}

impl StoreBackend {
    pub(crate) fn open(config: &StorageConfig, feed: ChangeFeed) -> Self {
        match &config.slot_path {
            Some(path) => Self::slot(path, feed),
            None => Self::Memory(InMemorySubmissionStore::with_feed(feed)),
        }
    }

    pub(crate) fn slot(path: &Path, feed: ChangeFeed) -> Self {
        Self::Slot(JsonSlotStore::with_feed(path, feed))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            StoreBackend::Memory(_) => "memory".to_string(),
            StoreBackend::Slot(store) => format!("slot:{}", store.path().display()),
        }
    }

    fn inner(&self) -> &dyn SubmissionStore {
        match self {
            StoreBackend::Memory(store) => store,
            StoreBackend::Slot(store) => store,
        }
    }
}

impl SubmissionStore for StoreBackend {
    fn list(&self) -> Result<Vec<Submission>, StoreError> {
        self.inner().list()
    }

    fn create(&self, record: Submission) -> Result<Submission, StoreError> {
        self.inner().create(record)
    }

    fn update(&self, id: &ComplaintId, mutation: Mutation<'_>) -> Result<Submission, StoreError> {
        self.inner().update(id, mutation)
    }

    fn delete(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        self.inner().delete(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner().subscribe()
    }
}

/// Log every change event until the feed closes.
pub(crate) async fn log_changes(mut events: broadcast::Receiver<ChangeEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!(?event, "complaint desk change"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "change log fell behind the feed")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use complaint_desk::workflows::complaints::{
        ComplaintStatus, ComplaintType, ContactDetails,
    };

    fn sample(id: &str) -> Submission {
        Submission {
            id: ComplaintId(id.to_string()),
            complaint_type: ComplaintType::External,
            status: ComplaintStatus::Pending,
            date_submitted: chrono::NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date"),
            email: "vendor@example.com".to_string(),
            details: ContactDetails::default(),
            description: "Late payment".to_string(),
            evidence: None,
            appeal: None,
        }
    }

    #[test]
    fn memory_backend_is_the_default() {
        let backend = StoreBackend::open(&StorageConfig { slot_path: None }, ChangeFeed::new());
        assert_eq!(backend.describe(), "memory");
        backend.create(sample("REF-1200")).expect("create");
        assert_eq!(backend.list().expect("list").len(), 1);
    }

    #[test]
    fn slot_backend_writes_to_the_configured_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("complaints.json");
        let feed = ChangeFeed::new();
        let mut events = feed.subscribe();
        let backend = StoreBackend::open(
            &StorageConfig {
                slot_path: Some(path.clone()),
            },
            feed,
        );

        backend.create(sample("REF-1300")).expect("create");
        assert!(path.exists());
        assert!(backend.describe().starts_with("slot:"));
        assert_eq!(
            events.try_recv().expect("event"),
            ChangeEvent::SubmissionCreated {
                id: ComplaintId("REF-1300".to_string())
            }
        );
    }
}
