use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    AppealData, ComplaintId, ComplaintStatus, ComplaintType, StatusLabel, Submission,
};
use super::form::ValidationError;
use super::sanitize::{evidence_name, non_blank};
use super::store::{StoreError, SubmissionStore};

/// Public status tracking by reference, plus the single appeal path.
pub struct StatusLookup<S> {
    store: Arc<S>,
}

/// Appeal payload filed against a declined submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealRequest {
    pub reason: String,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// What a complainant sees when tracking a reference.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub id: ComplaintId,
    pub complaint_type: ComplaintType,
    pub status: ComplaintStatus,
    pub label: StatusLabel,
    pub date_submitted: NaiveDate,
    pub appeal_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal: Option<AppealData>,
}

impl From<&Submission> for StatusView {
    fn from(record: &Submission) -> Self {
        Self {
            id: record.id.clone(),
            complaint_type: record.complaint_type,
            status: record.status,
            label: record.status_label(),
            date_submitted: record.date_submitted,
            appeal_available: record.appeal_available(),
            appeal: record.appeal.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("a reference is required")]
    EmptyReference,
    #[error("no complaint found for reference '{reference}'")]
    NotFound { reference: String },
    #[error("an appeal cannot be filed while the complaint is {label}")]
    AppealNotAllowed { label: StatusLabel },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> StatusLookup<S>
where
    S: SubmissionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Exact, case-insensitive match on the reference. No partial matches.
    pub fn find(&self, reference: &str) -> Result<Submission, LookupError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LookupError::EmptyReference);
        }

        self.store
            .list()?
            .into_iter()
            .find(|record| record.id.matches(reference))
            .ok_or_else(|| LookupError::NotFound {
                reference: reference.to_string(),
            })
    }

    pub fn status(&self, reference: &str) -> Result<StatusView, LookupError> {
        self.find(reference).map(|record| StatusView::from(&record))
    }

    /// Declined → Appeal, once per record.
    ///
    /// The eligibility check is repeated inside the store update so that a decision or
    /// another appeal landing in between cannot be overwritten.
    pub fn file_appeal(
        &self,
        reference: &str,
        request: AppealRequest,
        today: NaiveDate,
    ) -> Result<Submission, LookupError> {
        let record = self.find(reference)?;
        if !record.appeal_available() {
            return Err(LookupError::AppealNotAllowed {
                label: record.status_label(),
            });
        }

        let reason = non_blank(Some(request.reason))
            .ok_or(ValidationError::MissingField { field: "reason" })?;
        let appeal = AppealData {
            reason,
            evidence: request.evidence.as_deref().and_then(evidence_name),
            date: today,
        };

        let mut refused = None;
        let stored = self
            .store
            .update(
                &record.id,
                Box::new(|current: &mut Submission| {
                    if !current.appeal_available() {
                        refused = Some(current.status_label());
                        return false;
                    }
                    current.status = ComplaintStatus::Appeal;
                    current.appeal = Some(appeal);
                    true
                }),
            )
            .map_err(|err| match err {
                StoreError::NotFound => LookupError::NotFound {
                    reference: record.id.to_string(),
                },
                other => LookupError::Store(other),
            })?;
        if let Some(label) = refused {
            return Err(LookupError::AppealNotAllowed { label });
        }

        info!(reference = %stored.id, "appeal filed");
        Ok(stored)
    }
}
