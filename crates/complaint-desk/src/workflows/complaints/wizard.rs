//! Four-step intake wizard: charter, contact verification, form entry, confirmation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{ComplaintId, ComplaintStatus, ComplaintType, Submission};
use super::form::{validate_email, ComplaintForm, ValidationError};
use super::store::{StoreError, SubmissionStore};
use super::verification::{
    generate_code, Challenge, CodeSender, DeliveryError, IssuedCode, VerificationPolicy,
};

/// Draws before giving up on finding an unused reference.
const REFERENCE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Charter,
    Verification,
    FormEntry,
    Confirmation,
}

impl WizardStep {
    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::Charter => "charter",
            WizardStep::Verification => "verification",
            WizardStep::FormEntry => "form_entry",
            WizardStep::Confirmation => "confirmation",
        }
    }

    /// One-based position shown in the progress bar.
    pub const fn position(self) -> u8 {
        match self {
            WizardStep::Charter => 1,
            WizardStep::Verification => 2,
            WizardStep::FormEntry => 3,
            WizardStep::Confirmation => 4,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sub-step inside `Verification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    ContactEntry,
    AwaitingCode,
}

/// Per-complainant wizard state. Drive it through [`IntakeService`].
#[derive(Debug, Clone)]
pub struct IntakeWizard {
    complaint_type: ComplaintType,
    step: WizardStep,
    charter_accepted: bool,
    challenge: Challenge,
    contact: Option<String>,
    issued_code: Option<IssuedCode>,
    reference: Option<ComplaintId>,
}

impl IntakeWizard {
    pub fn new(complaint_type: ComplaintType) -> Self {
        Self {
            complaint_type,
            step: WizardStep::Charter,
            charter_accepted: false,
            challenge: Challenge::generate(&mut rand::thread_rng()),
            contact: None,
            issued_code: None,
            reference: None,
        }
    }

    pub fn complaint_type(&self) -> ComplaintType {
        self.complaint_type
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn charter_accepted(&self) -> bool {
        self.charter_accepted
    }

    /// Current challenge; rotates after every contact submission or on request.
    pub fn challenge(&self) -> &str {
        self.challenge.as_str()
    }

    /// The address the code was sent to, or the verified address once past verification.
    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    pub fn reference(&self) -> Option<&ComplaintId> {
        self.reference.as_ref()
    }

    pub fn verification_stage(&self) -> Option<VerificationStage> {
        match (self.step, &self.issued_code) {
            (WizardStep::Verification, Some(_)) => Some(VerificationStage::AwaitingCode),
            (WizardStep::Verification, None) => Some(VerificationStage::ContactEntry),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let stage = self.verification_stage();
        WizardSnapshot {
            complaint_type: self.complaint_type,
            step: self.step,
            position: self.step.position(),
            verification: stage,
            challenge: matches!(stage, Some(VerificationStage::ContactEntry))
                .then(|| self.challenge.as_str().to_string()),
            contact: self.contact.clone(),
            reference: self.reference.clone(),
        }
    }

    fn rotate_challenge(&mut self) {
        self.challenge = Challenge::generate(&mut rand::thread_rng());
    }

    fn expect_step(&self, expected: WizardStep, action: &'static str) -> Result<(), IntakeError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(IntakeError::OutOfOrder {
                step: self.step,
                action,
            })
        }
    }
}

/// Serializable view of a wizard for clients.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub complaint_type: ComplaintType,
    pub step: WizardStep,
    pub position: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ComplaintId>,
}

/// Errors surfaced while driving the wizard.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("intake session not found")]
    SessionNotFound,
    #[error("cannot {action} while the wizard is at the {step} step")]
    OutOfOrder {
        step: WizardStep,
        action: &'static str,
    },
    #[error("the confidentiality charter must be accepted to continue")]
    CharterNotAccepted,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the security code did not match; a new one has been generated")]
    ChallengeMismatch { challenge: String },
    #[error("verification code is incorrect ({remaining} attempts left)")]
    CodeMismatch { remaining: u32 },
    #[error("verification code has expired; request a new one")]
    CodeExpired,
    #[error("too many incorrect verification codes; request a new one")]
    AttemptsExhausted,
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("no unused reference could be allocated")]
    ReferencesExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives wizards and writes completed submissions to the store.
pub struct IntakeService<S, D> {
    store: Arc<S>,
    sender: Arc<D>,
    policy: VerificationPolicy,
}

impl<S, D> IntakeService<S, D>
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    pub fn new(store: Arc<S>, sender: Arc<D>, policy: VerificationPolicy) -> Self {
        Self {
            store,
            sender,
            policy,
        }
    }

    pub fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Charter → Verification, only with an explicit acknowledgement.
    pub fn accept_charter(
        &self,
        wizard: &mut IntakeWizard,
        acknowledged: bool,
    ) -> Result<(), IntakeError> {
        wizard.expect_step(WizardStep::Charter, "accept the charter")?;
        if !acknowledged {
            return Err(IntakeError::CharterNotAccepted);
        }
        wizard.charter_accepted = true;
        wizard.step = WizardStep::Verification;
        Ok(())
    }

    /// Check the echoed challenge, then issue and deliver a one-time code.
    pub fn submit_contact(
        &self,
        wizard: &mut IntakeWizard,
        email: &str,
        challenge_answer: &str,
        now: DateTime<Utc>,
    ) -> Result<(), IntakeError> {
        wizard.expect_step(WizardStep::Verification, "submit contact details")?;
        if wizard.issued_code.is_some() {
            return Err(IntakeError::OutOfOrder {
                step: wizard.step,
                action: "submit contact details before resetting the pending code",
            });
        }

        let email = validate_email(email)?;

        let matched = wizard.challenge.matches(challenge_answer);
        wizard.rotate_challenge();
        if !matched {
            debug!(complaint_type = %wizard.complaint_type, "challenge mismatch");
            return Err(IntakeError::ChallengeMismatch {
                challenge: wizard.challenge().to_string(),
            });
        }

        let code = generate_code(&mut rand::thread_rng());
        self.sender.send_code(&email, &code)?;

        wizard.contact = Some(email);
        wizard.issued_code = Some(IssuedCode::new(code, now));
        Ok(())
    }

    /// Draw a new challenge while the contact is still being entered.
    pub fn refresh_challenge(&self, wizard: &mut IntakeWizard) -> Result<(), IntakeError> {
        if wizard.verification_stage() != Some(VerificationStage::ContactEntry) {
            return Err(IntakeError::OutOfOrder {
                step: wizard.step,
                action: "refresh the challenge",
            });
        }
        wizard.rotate_challenge();
        Ok(())
    }

    /// Discard a pending code so the contact can be re-entered.
    pub fn reset_contact(&self, wizard: &mut IntakeWizard) -> Result<(), IntakeError> {
        wizard.expect_step(WizardStep::Verification, "reset the contact")?;
        wizard.issued_code = None;
        wizard.contact = None;
        Ok(())
    }

    /// Verification → FormEntry when the submitted code equals the issued one.
    pub fn confirm_code(
        &self,
        wizard: &mut IntakeWizard,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), IntakeError> {
        wizard.expect_step(WizardStep::Verification, "confirm a code")?;
        let policy = self.policy;
        let issued = wizard.issued_code.as_mut().ok_or(IntakeError::OutOfOrder {
            step: WizardStep::Verification,
            action: "confirm a code before one was sent",
        })?;

        if issued.is_expired(now, policy.code_ttl) {
            wizard.issued_code = None;
            wizard.contact = None;
            return Err(IntakeError::CodeExpired);
        }

        let submitted: String = code.chars().filter(char::is_ascii_digit).collect();
        if submitted == issued.code {
            wizard.issued_code = None;
            wizard.step = WizardStep::FormEntry;
            return Ok(());
        }

        issued.failed_attempts += 1;
        if issued.failed_attempts >= policy.max_code_attempts {
            wizard.issued_code = None;
            wizard.contact = None;
            return Err(IntakeError::AttemptsExhausted);
        }

        Err(IntakeError::CodeMismatch {
            remaining: policy.max_code_attempts - issued.failed_attempts,
        })
    }

    /// FormEntry → Confirmation: validate, stamp, and persist the submission.
    pub fn submit_form(
        &self,
        wizard: &mut IntakeWizard,
        form: ComplaintForm,
        today: NaiveDate,
    ) -> Result<Submission, IntakeError> {
        wizard.expect_step(WizardStep::FormEntry, "submit the complaint form")?;
        let email = wizard.contact.clone().ok_or(IntakeError::OutOfOrder {
            step: wizard.step,
            action: "submit a form without a verified contact",
        })?;

        let validated = form.validate(wizard.complaint_type)?;
        let id = self.allocate_reference()?;

        let submission = Submission {
            id,
            complaint_type: wizard.complaint_type,
            status: ComplaintStatus::Pending,
            date_submitted: today,
            email,
            details: validated.details,
            description: validated.description,
            evidence: validated.evidence,
            appeal: None,
        };

        let stored = self.store.create(submission)?;
        info!(reference = %stored.id, complaint_type = %stored.complaint_type, "complaint submitted");

        wizard.reference = Some(stored.id.clone());
        wizard.step = WizardStep::Confirmation;
        Ok(stored)
    }

    fn allocate_reference(&self) -> Result<ComplaintId, IntakeError> {
        let taken: HashSet<ComplaintId> = self
            .store
            .list()?
            .into_iter()
            .map(|record| record.id)
            .collect();

        let mut rng = rand::thread_rng();
        (0..REFERENCE_ATTEMPTS)
            .map(|_| ComplaintId::generate(&mut rng))
            .find(|candidate| !taken.contains(candidate))
            .ok_or(IntakeError::ReferencesExhausted)
    }
}
