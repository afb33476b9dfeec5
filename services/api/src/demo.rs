use crate::infra::StoreBackend;
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use complaint_desk::config::{AppConfig, StorageConfig};
use complaint_desk::error::AppError;
use complaint_desk::workflows::complaints::{
    AdminCredentials, AdminSession, AppealRequest, ChangeFeed, CodeSender, ComplaintDesk,
    ComplaintForm, ComplaintType, ContactDetails, DeliveryError, DeskOptions, LookupError,
    ReviewDecision, ReviewError, ReviewPanel, StatusCounts, StatusFilter, StatusLookup,
    StatusView, Submission,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Persist the demo complaint to this slot file instead of memory.
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Stop after the first decline instead of walking through an appeal.
    #[arg(long)]
    pub(crate) skip_appeal: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// Restrict the listing to one status (pending, accepted, declined, appeal)
    #[arg(long, default_value = "all")]
    pub(crate) status: StatusFilter,
    /// Slot file to read (defaults to APP_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// Complaint reference, e.g. REF-1234 (case-insensitive)
    pub(crate) reference: String,
    /// Slot file to read (defaults to APP_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
}

/// Keeps the last delivered code so the demo can answer its own verification step.
#[derive(Default)]
pub(crate) struct DemoOutbox {
    last: Mutex<Option<String>>,
}

impl DemoOutbox {
    fn last_code(&self) -> Option<String> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }
}

impl CodeSender for DemoOutbox {
    fn send_code(&self, destination: &str, code: &str) -> Result<(), DeliveryError> {
        let mut guard = self
            .last
            .lock()
            .map_err(|_| DeliveryError::Transport("demo outbox poisoned".to_string()))?;
        *guard = Some(code.to_string());
        println!("  (code {} delivered to {})", code, destination);
        Ok(())
    }
}

pub(crate) struct DemoOutcome {
    pub(crate) submission: Submission,
    pub(crate) final_view: StatusView,
    pub(crate) counts: StatusCounts,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { store, skip_appeal } = args;

    let feed = ChangeFeed::new();
    let backend = StoreBackend::open(&StorageConfig { slot_path: store }, feed.clone());
    println!("Complaint desk demo (store: {})", backend.describe());

    let outbox = Arc::new(DemoOutbox::default());
    let desk = ComplaintDesk::new(
        Arc::new(backend),
        outbox.clone(),
        AdminSession::new(AdminCredentials::default(), feed),
        DeskOptions::default(),
    );

    let today = Local::now().date_naive();
    match run_scenario(&desk, &outbox, today, skip_appeal) {
        Ok(outcome) => {
            println!(
                "\nFinal status for {}: {}",
                outcome.submission.id, outcome.final_view.label
            );
            render_counts(&outcome.counts);
            match serde_json::to_string_pretty(&outcome.final_view) {
                Ok(json) => println!("Public status payload:\n{}", json),
                Err(err) => println!("Public status payload unavailable: {}", err),
            }
        }
        Err(err) => println!("Demo stopped: {}", err),
    }

    Ok(())
}

pub(crate) fn run_scenario(
    desk: &ComplaintDesk<StoreBackend, DemoOutbox>,
    outbox: &DemoOutbox,
    today: NaiveDate,
    skip_appeal: bool,
) -> Result<DemoOutcome, String> {
    println!("\nIntake (client complaint)");
    let (session, snapshot) = desk
        .start_intake(ComplaintType::Client)
        .map_err(|err| err.to_string())?;
    println!("- Step {} of 4: {}", snapshot.position, snapshot.step);

    let (_, snapshot) = desk
        .with_wizard(&session, |intake, wizard| intake.accept_charter(wizard, true))
        .map_err(|err| err.to_string())?;
    let challenge = snapshot
        .challenge
        .ok_or_else(|| "no challenge issued after the charter".to_string())?;
    println!("- Charter accepted; security challenge {}", challenge);

    desk.with_wizard(&session, |intake, wizard| {
        intake.submit_contact(wizard, "jane.doe@example.com", &challenge, Utc::now())
    })
    .map_err(|err| err.to_string())?;
    let code = outbox
        .last_code()
        .ok_or_else(|| "no verification code was delivered".to_string())?;
    let (_, snapshot) = desk
        .with_wizard(&session, |intake, wizard| {
            intake.confirm_code(wizard, &code, Utc::now())
        })
        .map_err(|err| err.to_string())?;
    println!("- Contact verified; now at {}", snapshot.step);

    let (submission, _) = desk
        .with_wizard(&session, |intake, wizard| {
            intake.submit_form(wizard, demo_form(today), today)
        })
        .map_err(|err| err.to_string())?;
    desk.close_intake(&session).map_err(|err| err.to_string())?;
    println!(
        "- Submitted {} on {} -> {}",
        submission.id, submission.date_submitted, submission.status
    );

    println!("\nReview");
    if !desk.session().login("admin", "admin") {
        return Err("reviewer login refused".to_string());
    }
    let declined = desk
        .review()
        .set_status(&submission.id, ReviewDecision::Decline)
        .map_err(|err| err.to_string())?;
    println!("- Reviewer decision: {}", declined.status_label());

    if !skip_appeal {
        println!("\nAppeal");
        let appealed = desk
            .lookup()
            .file_appeal(
                submission.id.as_str(),
                AppealRequest {
                    reason: "The carrier confirmed the damage in writing".to_string(),
                    evidence: Some("carrier-letter.pdf".to_string()),
                },
                today,
            )
            .map_err(|err| err.to_string())?;
        println!("- Appeal filed -> {}", appealed.status_label());

        let final_record = desk
            .review()
            .set_status(&submission.id, ReviewDecision::Decline)
            .map_err(|err| err.to_string())?;
        println!("- Appeal reviewed -> {}", final_record.status_label());
    }
    desk.session().logout();

    let final_view = desk
        .lookup()
        .status(submission.id.as_str())
        .map_err(|err| err.to_string())?;
    let counts = desk.review().counts().map_err(|err| err.to_string())?;

    Ok(DemoOutcome {
        submission,
        final_view,
        counts,
    })
}

fn demo_form(today: NaiveDate) -> ComplaintForm {
    ComplaintForm {
        details: ContactDetails {
            full_name: Some("Jane Doe".to_string()),
            company: Some("Doe Retail".to_string()),
            phone: Some("+33 6 12 34 56 78".to_string()),
            order_number: Some("ORD-55120".to_string()),
            department: Some("logistique".to_string()),
            relation_type: Some("retailer".to_string()),
            incident_date: today.and_hms_opt(9, 30, 0),
            anonymous: false,
            ..ContactDetails::default()
        },
        description: "Pallet delivered with crushed cartons".to_string(),
        evidence: Some("photos/pallet.jpg".to_string()),
    }
}

fn resolve_store(store: Option<PathBuf>) -> Result<Option<PathBuf>, AppError> {
    match store {
        Some(path) => Ok(Some(path)),
        None => Ok(AppConfig::load()?.storage.slot_path),
    }
}

fn open_for_reading(store: Option<PathBuf>) -> Result<Option<Arc<StoreBackend>>, AppError> {
    Ok(resolve_store(store)?
        .map(|path| Arc::new(StoreBackend::slot(&path, ChangeFeed::new()))))
}

pub(crate) fn run_list(args: ListArgs) -> Result<(), AppError> {
    let Some(store) = open_for_reading(args.store)? else {
        println!("No slot file configured; pass --store or set APP_STORE_PATH");
        return Ok(());
    };

    let panel = ReviewPanel::new(store.clone());
    let records = match panel.list_filtered(args.status) {
        Ok(records) => records,
        Err(ReviewError::Store(err)) => return Err(AppError::Store(err)),
        Err(err) => {
            println!("Listing unavailable: {}", err);
            return Ok(());
        }
    };

    println!(
        "Complaints ({}, filter {})",
        store.describe(),
        args.status
    );
    if records.is_empty() {
        println!("- none");
    }
    for record in &records {
        println!(
            "- {} | {} | {} | submitted {} | {}",
            record.id,
            record.complaint_type,
            record.status_label(),
            record.date_submitted,
            record.email
        );
    }

    if let Ok(counts) = panel.counts() {
        render_counts(&counts);
    }
    Ok(())
}

pub(crate) fn run_show(args: ShowArgs) -> Result<(), AppError> {
    let Some(store) = open_for_reading(args.store)? else {
        println!("No slot file configured; pass --store or set APP_STORE_PATH");
        return Ok(());
    };

    let lookup = StatusLookup::new(store);
    match lookup.find(&args.reference) {
        Ok(record) => {
            let view = StatusView::from(&record);
            println!("{} ({})", record.id, record.complaint_type);
            println!("- Status: {}", view.label);
            println!("- Submitted: {}", record.date_submitted);
            println!("- Description: {}", record.description);
            if let Some(appeal) = &record.appeal {
                println!("- Appeal filed {}: {}", appeal.date, appeal.reason);
            }
            if view.appeal_available {
                println!("- An appeal can be filed against this decision");
            }
            Ok(())
        }
        Err(LookupError::Store(err)) => Err(AppError::Store(err)),
        Err(err) => {
            println!("{}", err);
            Ok(())
        }
    }
}

fn render_counts(counts: &StatusCounts) {
    println!(
        "Totals: {} complaints | {} pending | {} accepted | {} declined | {} in appeal",
        counts.total, counts.pending, counts.accepted, counts.declined, counts.appeal
    );
}
