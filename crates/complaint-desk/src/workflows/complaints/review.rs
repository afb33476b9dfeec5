use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::{
    ComplaintId, ComplaintStatus, ReviewDecision, ReviewTransition, Submission, UnknownStatus,
};
use super::store::{StoreError, SubmissionStore};

/// Reviewer-facing listing and decisions over every submission.
pub struct ReviewPanel<S> {
    store: Arc<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ComplaintStatus),
}

impl StatusFilter {
    pub fn admits(self, record: &Submission) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => record.status == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        trimmed.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => write!(f, "{status}"),
        }
    }
}

/// Per-status tallies for the panel header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub appeal: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("no complaint found for reference '{0}'")]
    NotFound(ComplaintId),
    #[error("cannot move a {from} complaint to {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> ReviewPanel<S>
where
    S: SubmissionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records in store (insertion) order, optionally narrowed to one status.
    pub fn list_filtered(&self, filter: StatusFilter) -> Result<Vec<Submission>, ReviewError> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|record| filter.admits(record))
            .collect())
    }

    pub fn get(&self, id: &ComplaintId) -> Result<Submission, ReviewError> {
        self.store
            .list()?
            .into_iter()
            .find(|record| &record.id == id)
            .ok_or_else(|| ReviewError::NotFound(id.clone()))
    }

    /// Apply a decision. Repeating the current terminal status is a no-op.
    ///
    /// The transition is evaluated against the record held by the store at write time.
    pub fn set_status(
        &self,
        id: &ComplaintId,
        decision: ReviewDecision,
    ) -> Result<Submission, ReviewError> {
        let mut outcome = ReviewTransition::Unchanged;
        let mut from = None;
        let stored = self
            .store
            .update(
                id,
                Box::new(|current: &mut Submission| {
                    from = Some(current.status);
                    outcome = current.status.review(decision);
                    match outcome {
                        ReviewTransition::Apply(status) => {
                            current.status = status;
                            true
                        }
                        ReviewTransition::Unchanged | ReviewTransition::Rejected => false,
                    }
                }),
            )
            .map_err(|err| match err {
                StoreError::NotFound => ReviewError::NotFound(id.clone()),
                other => ReviewError::Store(other),
            })?;

        match (outcome, from) {
            (ReviewTransition::Rejected, Some(from)) => Err(ReviewError::InvalidTransition {
                from,
                to: decision.target_status(),
            }),
            (ReviewTransition::Apply(to), Some(from)) => {
                info!(reference = %stored.id, %from, %to, "review decision applied");
                Ok(stored)
            }
            _ => Ok(stored),
        }
    }

    /// Unconditional removal; unknown references leave the collection untouched.
    pub fn delete(&self, id: &ComplaintId) -> Result<bool, ReviewError> {
        let removed = self.store.delete(id)?;
        if removed {
            info!(reference = %id, "complaint deleted");
        }
        Ok(removed)
    }

    pub fn counts(&self) -> Result<StatusCounts, ReviewError> {
        let records = self.store.list()?;
        let mut counts = StatusCounts {
            total: records.len(),
            ..StatusCounts::default()
        };
        for record in &records {
            match record.status {
                ComplaintStatus::Pending => counts.pending += 1,
                ComplaintStatus::Accepted => counts.accepted += 1,
                ComplaintStatus::Declined => counts.declined += 1,
                ComplaintStatus::Appeal => counts.appeal += 1,
            }
        }
        Ok(counts)
    }
}
