use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::workflows::complaints::desk::{ComplaintDesk, DeskOptions};
use crate::workflows::complaints::domain::{
    incident_format, ComplaintId, ComplaintStatus, ComplaintType, ContactDetails, Submission,
};
use crate::workflows::complaints::form::ComplaintForm;
use crate::workflows::complaints::session::{AdminCredentials, AdminSession};
use crate::workflows::complaints::store::{
    ChangeEvent, ChangeFeed, InMemorySubmissionStore, Mutation, StoreError, SubmissionStore,
};
use crate::workflows::complaints::verification::{
    CodeSender, DeliveryError, VerificationPolicy,
};
use crate::workflows::complaints::wizard::{IntakeService, IntakeWizard};

pub(super) const EMAIL: &str = "jane.doe@example.com";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
}

pub(super) fn policy() -> VerificationPolicy {
    VerificationPolicy {
        code_ttl: std::time::Duration::from_secs(300),
        max_code_attempts: 3,
    }
}

/// Captures every code handed to it instead of delivering it.
#[derive(Default)]
pub(super) struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub(super) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }

    pub(super) fn last_code(&self) -> String {
        self.sent()
            .last()
            .map(|(_, code)| code.clone())
            .expect("a code was sent")
    }
}

impl CodeSender for RecordingSender {
    fn send_code(&self, destination: &str, code: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("sender mutex poisoned")
            .push((destination.to_string(), code.to_string()));
        Ok(())
    }
}

pub(super) struct FailingSender;

impl CodeSender for FailingSender {
    fn send_code(&self, _destination: &str, _code: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableStore {
    feed: ChangeFeed,
}

impl UnavailableStore {
    pub(super) fn new() -> Self {
        Self {
            feed: ChangeFeed::new(),
        }
    }
}

impl SubmissionStore for UnavailableStore {
    fn list(&self) -> Result<Vec<Submission>, StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }

    fn create(&self, _record: Submission) -> Result<Submission, StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }

    fn update(&self, _id: &ComplaintId, _mutation: Mutation<'_>) -> Result<Submission, StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }

    fn delete(&self, _id: &ComplaintId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

/// Serves one outdated `list()` snapshot, as a reader racing a concurrent writer would see.
pub(super) struct StaleReads {
    inner: Arc<InMemorySubmissionStore>,
    snapshot: Mutex<Option<Vec<Submission>>>,
}

impl StaleReads {
    pub(super) fn new(inner: Arc<InMemorySubmissionStore>, snapshot: Vec<Submission>) -> Self {
        Self {
            inner,
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SubmissionStore for StaleReads {
    fn list(&self) -> Result<Vec<Submission>, StoreError> {
        match self.snapshot.lock().expect("snapshot mutex poisoned").take() {
            Some(snapshot) => Ok(snapshot),
            None => self.inner.list(),
        }
    }

    fn create(&self, record: Submission) -> Result<Submission, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, id: &ComplaintId, mutation: Mutation<'_>) -> Result<Submission, StoreError> {
        self.inner.update(id, mutation)
    }

    fn delete(&self, id: &ComplaintId) -> Result<bool, StoreError> {
        self.inner.delete(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.subscribe()
    }
}

pub(super) type MemoryIntake = IntakeService<InMemorySubmissionStore, RecordingSender>;

pub(super) fn build_intake() -> (
    MemoryIntake,
    Arc<InMemorySubmissionStore>,
    Arc<RecordingSender>,
) {
    let store = Arc::new(InMemorySubmissionStore::new());
    let sender = Arc::new(RecordingSender::default());
    let service = IntakeService::new(store.clone(), sender.clone(), policy());
    (service, store, sender)
}

/// Walks a fresh wizard through charter and verification.
pub(super) fn verified_wizard(
    service: &MemoryIntake,
    sender: &RecordingSender,
    complaint_type: ComplaintType,
) -> IntakeWizard {
    let mut wizard = IntakeWizard::new(complaint_type);
    service
        .accept_charter(&mut wizard, true)
        .expect("charter accepted");
    let challenge = wizard.challenge().to_lowercase();
    service
        .submit_contact(&mut wizard, EMAIL, &challenge, now())
        .expect("contact accepted");
    service
        .confirm_code(&mut wizard, &sender.last_code(), now())
        .expect("code confirmed");
    wizard
}

pub(super) fn incident() -> Option<chrono::NaiveDateTime> {
    Some(incident_format::parse("2026-03-01T16:45").expect("valid timestamp"))
}

pub(super) fn client_form(description: &str) -> ComplaintForm {
    ComplaintForm {
        details: ContactDetails {
            full_name: Some("Jane Doe".to_string()),
            phone: Some("+33 6 12 34 56 78".to_string()),
            department: Some("logistique".to_string()),
            relation_type: Some("client-direct".to_string()),
            incident_date: incident(),
            ..ContactDetails::default()
        },
        description: description.to_string(),
        evidence: Some("photos/damaged-box.jpg".to_string()),
    }
}

pub(super) fn employee_form(description: &str) -> ComplaintForm {
    ComplaintForm {
        details: ContactDetails {
            employee_id: Some("E-2041".to_string()),
            supervisor: Some("Marc Dupont".to_string()),
            incident_date: incident(),
            ..ContactDetails::default()
        },
        description: description.to_string(),
        evidence: None,
    }
}

pub(super) fn record(id: &str, status: ComplaintStatus) -> Submission {
    Submission {
        id: ComplaintId(id.to_string()),
        complaint_type: ComplaintType::Client,
        status,
        date_submitted: today(),
        email: EMAIL.to_string(),
        details: ContactDetails {
            full_name: Some("Jane Doe".to_string()),
            phone: Some("+33612345678".to_string()),
            incident_date: incident(),
            ..ContactDetails::default()
        },
        description: "Parcel arrived crushed".to_string(),
        evidence: None,
        appeal: None,
    }
}

pub(super) fn seeded_store(records: Vec<Submission>) -> Arc<InMemorySubmissionStore> {
    let store = Arc::new(InMemorySubmissionStore::new());
    for record in records {
        store.create(record).expect("seed record");
    }
    store
}

pub(super) type MemoryDesk = ComplaintDesk<InMemorySubmissionStore, RecordingSender>;

pub(super) fn build_desk(
    store: Arc<InMemorySubmissionStore>,
) -> (Arc<MemoryDesk>, Arc<RecordingSender>) {
    build_desk_with(store, std::time::Duration::from_secs(60))
}

pub(super) fn build_desk_with(
    store: Arc<InMemorySubmissionStore>,
    session_idle: std::time::Duration,
) -> (Arc<MemoryDesk>, Arc<RecordingSender>) {
    let sender = Arc::new(RecordingSender::default());
    let session = AdminSession::new(AdminCredentials::default(), ChangeFeed::new());
    let desk = ComplaintDesk::new(
        store,
        sender.clone(),
        session,
        DeskOptions {
            verification: policy(),
            simulated_latency: std::time::Duration::ZERO,
            session_idle,
        },
    );
    (Arc::new(desk), sender)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
