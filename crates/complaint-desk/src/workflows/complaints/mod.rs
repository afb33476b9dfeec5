//! Complaint intake, status tracking, and review.
//!
//! A submission is created by the intake wizard, read and appealed through the status
//! lookup, and decided or deleted from the review panel. The three services only meet
//! through a shared [`SubmissionStore`].

pub mod desk;
pub mod domain;
pub mod form;
pub mod lookup;
pub mod review;
pub mod router;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod verification;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use desk::{ComplaintDesk, DeskOptions};
pub use domain::{
    AppealData, ComplaintId, ComplaintStatus, ComplaintType, ContactDetails, ReviewDecision,
    StatusLabel, Submission,
};
pub use form::{ComplaintForm, ValidationError};
pub use lookup::{AppealRequest, LookupError, StatusLookup, StatusView};
pub use review::{ReviewError, ReviewPanel, StatusCounts, StatusFilter};
pub use router::complaint_router;
pub use session::{AdminCredentials, AdminSession};
pub use store::{
    ChangeEvent, ChangeFeed, InMemorySubmissionStore, JsonSlotStore, Mutation, StoreError,
    SubmissionStore,
};
pub use verification::{CodeSender, DeliveryError, LoggingCodeSender, VerificationPolicy};
pub use wizard::{IntakeError, IntakeService, IntakeWizard, VerificationStage, WizardStep};
