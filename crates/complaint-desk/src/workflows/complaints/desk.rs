use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::domain::ComplaintType;
use super::lookup::StatusLookup;
use super::review::ReviewPanel;
use super::session::AdminSession;
use super::store::{ChangeEvent, StoreError, SubmissionStore};
use super::verification::{CodeSender, VerificationPolicy};
use super::wizard::{IntakeError, IntakeService, IntakeWizard, WizardSnapshot};

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Knobs for assembling a [`ComplaintDesk`].
#[derive(Debug, Clone)]
pub struct DeskOptions {
    pub verification: VerificationPolicy,
    /// Cosmetic pause applied before submit actions.
    pub simulated_latency: Duration,
    /// Open intakes untouched for this long are dropped.
    pub session_idle: Duration,
}

impl Default for DeskOptions {
    fn default() -> Self {
        Self {
            verification: VerificationPolicy::default(),
            simulated_latency: Duration::ZERO,
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }
}

/// One open intake. The wizard has its own lock so the session map is only held for lookups.
struct OpenIntake {
    wizard: Arc<Mutex<IntakeWizard>>,
    touched_at: Instant,
}

/// Everything the HTTP layer needs: the three services over one store, the admin
/// flag, and the open intake wizards keyed by session.
pub struct ComplaintDesk<S, D> {
    store: Arc<S>,
    intake: IntakeService<S, D>,
    lookup: StatusLookup<S>,
    review: ReviewPanel<S>,
    session: AdminSession,
    wizards: Mutex<HashMap<Uuid, OpenIntake>>,
    simulated_latency: Duration,
    session_idle: Duration,
}

impl<S, D> ComplaintDesk<S, D>
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    pub fn new(store: Arc<S>, sender: Arc<D>, session: AdminSession, options: DeskOptions) -> Self {
        Self {
            intake: IntakeService::new(store.clone(), sender, options.verification),
            lookup: StatusLookup::new(store.clone()),
            review: ReviewPanel::new(store.clone()),
            store,
            session,
            wizards: Mutex::new(HashMap::new()),
            simulated_latency: options.simulated_latency,
            session_idle: options.session_idle,
        }
    }

    pub fn intake(&self) -> &IntakeService<S, D> {
        &self.intake
    }

    pub fn lookup(&self) -> &StatusLookup<S> {
        &self.lookup
    }

    pub fn review(&self) -> &ReviewPanel<S> {
        &self.review
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe()
    }

    pub async fn simulate_latency(&self) {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
    }

    pub fn start_intake(&self, complaint_type: ComplaintType) -> Result<(Uuid, WizardSnapshot), IntakeError> {
        let wizard = IntakeWizard::new(complaint_type);
        let snapshot = wizard.snapshot();
        let session_id = Uuid::new_v4();
        let now = Instant::now();
        let mut wizards = self.lock_wizards()?;
        self.evict_idle(&mut wizards, now);
        wizards.insert(
            session_id,
            OpenIntake {
                wizard: Arc::new(Mutex::new(wizard)),
                touched_at: now,
            },
        );
        Ok((session_id, snapshot))
    }

    /// Run `action` against an open wizard and return its result plus the new snapshot.
    ///
    /// Only the wizard itself stays locked while `action` runs; other sessions proceed.
    pub fn with_wizard<T>(
        &self,
        session_id: &Uuid,
        action: impl FnOnce(&IntakeService<S, D>, &mut IntakeWizard) -> Result<T, IntakeError>,
    ) -> Result<(T, WizardSnapshot), IntakeError> {
        let wizard = {
            let now = Instant::now();
            let mut wizards = self.lock_wizards()?;
            self.evict_idle(&mut wizards, now);
            let open = wizards
                .get_mut(session_id)
                .ok_or(IntakeError::SessionNotFound)?;
            open.touched_at = now;
            open.wizard.clone()
        };

        let mut wizard = wizard.lock().map_err(|_| poisoned("intake wizard mutex poisoned"))?;
        let outcome = action(&self.intake, &mut wizard);
        let snapshot = wizard.snapshot();
        outcome.map(|value| (value, snapshot))
    }

    /// Number of intakes currently held open.
    pub fn open_intakes(&self) -> Result<usize, IntakeError> {
        let mut wizards = self.lock_wizards()?;
        self.evict_idle(&mut wizards, Instant::now());
        Ok(wizards.len())
    }

    /// Forget a wizard once it has produced its submission.
    pub fn close_intake(&self, session_id: &Uuid) -> Result<(), IntakeError> {
        self.lock_wizards()?.remove(session_id);
        Ok(())
    }

    fn lock_wizards(&self) -> Result<MutexGuard<'_, HashMap<Uuid, OpenIntake>>, IntakeError> {
        self.wizards
            .lock()
            .map_err(|_| poisoned("intake session mutex poisoned"))
    }

    fn evict_idle(&self, wizards: &mut HashMap<Uuid, OpenIntake>, now: Instant) {
        let before = wizards.len();
        wizards.retain(|_, open| now.saturating_duration_since(open.touched_at) < self.session_idle);
        let evicted = before - wizards.len();
        if evicted > 0 {
            debug!(evicted, "idle intake sessions dropped");
        }
    }
}

fn poisoned(reason: &str) -> IntakeError {
    IntakeError::Store(StoreError::Unavailable(reason.to_string()))
}
