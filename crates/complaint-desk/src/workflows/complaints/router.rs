use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::desk::ComplaintDesk;
use super::domain::{ComplaintId, ComplaintType, ReviewDecision, StatusLabel, Submission};
use super::form::ComplaintForm;
use super::lookup::{AppealRequest, LookupError, StatusView};
use super::review::{ReviewError, StatusFilter};
use super::store::{StoreError, SubmissionStore};
use super::verification::CodeSender;
use super::wizard::{IntakeError, WizardSnapshot};

type Desk<S, D> = Arc<ComplaintDesk<S, D>>;

/// Router exposing intake, status tracking, and the review panel.
pub fn complaint_router<S, D>(desk: Desk<S, D>) -> Router
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    Router::new()
        .route("/api/v1/intake", post(start_intake_handler::<S, D>))
        .route("/api/v1/intake/:session_id", get(intake_view_handler::<S, D>))
        .route(
            "/api/v1/intake/:session_id/charter",
            post(charter_handler::<S, D>),
        )
        .route(
            "/api/v1/intake/:session_id/challenge",
            post(challenge_handler::<S, D>),
        )
        .route(
            "/api/v1/intake/:session_id/contact",
            post(contact_handler::<S, D>),
        )
        .route(
            "/api/v1/intake/:session_id/contact/reset",
            post(reset_contact_handler::<S, D>),
        )
        .route("/api/v1/intake/:session_id/code", post(code_handler::<S, D>))
        .route("/api/v1/intake/:session_id/form", post(form_handler::<S, D>))
        .route("/api/v1/complaints/:reference", get(status_handler::<S, D>))
        .route(
            "/api/v1/complaints/:reference/appeal",
            post(appeal_handler::<S, D>),
        )
        .route("/api/v1/admin/login", post(login_handler::<S, D>))
        .route("/api/v1/admin/logout", post(logout_handler::<S, D>))
        .route("/api/v1/admin/complaints", get(review_list_handler::<S, D>))
        .route(
            "/api/v1/admin/complaints/counts",
            get(review_counts_handler::<S, D>),
        )
        .route(
            "/api/v1/admin/complaints/:reference",
            get(review_detail_handler::<S, D>).delete(review_delete_handler::<S, D>),
        )
        .route(
            "/api/v1/admin/complaints/:reference/status",
            post(review_status_handler::<S, D>),
        )
        .with_state(desk)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartIntakeRequest {
    #[serde(rename = "type")]
    pub(crate) complaint_type: ComplaintType,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CharterRequest {
    pub(crate) accepted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactRequest {
    pub(crate) email: String,
    pub(crate) challenge_answer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CodeRequest {
    pub(crate) code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) decision: ReviewDecision,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewListQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntakeResponse {
    session_id: Uuid,
    #[serde(flatten)]
    wizard: WizardSnapshot,
}

/// Panel row: the stored record plus its display label.
#[derive(Debug, Serialize)]
struct ReviewRow {
    label: StatusLabel,
    #[serde(flatten)]
    submission: Submission,
}

impl From<Submission> for ReviewRow {
    fn from(submission: Submission) -> Self {
        Self {
            label: submission.status_label(),
            submission,
        }
    }
}

fn intake_response(session_id: Uuid, wizard: WizardSnapshot, status: StatusCode) -> Response {
    (status, Json(IntakeResponse { session_id, wizard })).into_response()
}

pub(crate) fn intake_error_response(error: IntakeError) -> Response {
    let message = error.to_string();
    let (status, payload) = match error {
        IntakeError::SessionNotFound => (StatusCode::NOT_FOUND, json!({ "error": message })),
        IntakeError::OutOfOrder { step, .. } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "step": step }),
        ),
        IntakeError::Validation(ref validation) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "field": validation.field() }),
        ),
        IntakeError::ChallengeMismatch { challenge } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "challenge": challenge }),
        ),
        IntakeError::CodeMismatch { remaining } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "remaining_attempts": remaining }),
        ),
        IntakeError::CharterNotAccepted
        | IntakeError::CodeExpired
        | IntakeError::AttemptsExhausted => {
            (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message }))
        }
        IntakeError::Delivery(_) => (StatusCode::BAD_GATEWAY, json!({ "error": message })),
        IntakeError::ReferencesExhausted | IntakeError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": message }),
        ),
    };
    (status, Json(payload)).into_response()
}

pub(crate) fn lookup_error_response(error: LookupError) -> Response {
    let status = match &error {
        LookupError::EmptyReference => StatusCode::BAD_REQUEST,
        LookupError::NotFound { .. } => StatusCode::NOT_FOUND,
        LookupError::AppealNotAllowed { .. } => StatusCode::CONFLICT,
        LookupError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LookupError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

pub(crate) fn review_error_response(error: ReviewError) -> Response {
    let status = match &error {
        ReviewError::NotFound(_) | ReviewError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ReviewError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ReviewError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "admin session required" })),
    )
        .into_response()
}

fn parse_session(raw: &str) -> Result<Uuid, IntakeError> {
    Uuid::parse_str(raw).map_err(|_| IntakeError::SessionNotFound)
}

pub(crate) async fn start_intake_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Json(request): Json<StartIntakeRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    match desk.start_intake(request.complaint_type) {
        Ok((session_id, wizard)) => intake_response(session_id, wizard, StatusCode::CREATED),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn intake_view_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    let outcome = parse_session(&session_id)
        .and_then(|id| desk.with_wizard(&id, |_, _| Ok(())).map(|(_, wizard)| (id, wizard)));
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn charter_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
    Json(request): Json<CharterRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    let outcome = parse_session(&session_id).and_then(|id| {
        desk.with_wizard(&id, |intake, wizard| {
            intake.accept_charter(wizard, request.accepted)
        })
        .map(|(_, wizard)| (id, wizard))
    });
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn contact_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
    Json(request): Json<ContactRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    desk.simulate_latency().await;
    let now = Utc::now();
    let outcome = parse_session(&session_id).and_then(|id| {
        desk.with_wizard(&id, |intake, wizard| {
            intake.submit_contact(wizard, &request.email, &request.challenge_answer, now)
        })
        .map(|(_, wizard)| (id, wizard))
    });
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn challenge_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    let outcome = parse_session(&session_id).and_then(|id| {
        desk.with_wizard(&id, |intake, wizard| intake.refresh_challenge(wizard))
            .map(|(_, wizard)| (id, wizard))
    });
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn reset_contact_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    let outcome = parse_session(&session_id).and_then(|id| {
        desk.with_wizard(&id, |intake, wizard| intake.reset_contact(wizard))
            .map(|(_, wizard)| (id, wizard))
    });
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn code_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
    Json(request): Json<CodeRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    let now = Utc::now();
    let outcome = parse_session(&session_id).and_then(|id| {
        desk.with_wizard(&id, |intake, wizard| {
            intake.confirm_code(wizard, &request.code, now)
        })
        .map(|(_, wizard)| (id, wizard))
    });
    match outcome {
        Ok((id, wizard)) => intake_response(id, wizard, StatusCode::OK),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn form_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(session_id): Path<String>,
    Json(form): Json<ComplaintForm>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    desk.simulate_latency().await;
    let today = Local::now().date_naive();
    let outcome = parse_session(&session_id).and_then(|id| {
        let (submission, wizard) = desk.with_wizard(&id, |intake, wizard| {
            intake.submit_form(wizard, form, today)
        })?;
        desk.close_intake(&id)?;
        Ok((id, submission, wizard))
    });
    match outcome {
        Ok((id, submission, wizard)) => {
            let payload = json!({
                "session_id": id,
                "step": wizard.step,
                "id": submission.id,
                "status": submission.status,
                "date_submitted": submission.date_submitted,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn status_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(reference): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    match desk.lookup().status(&reference) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => lookup_error_response(error),
    }
}

pub(crate) async fn appeal_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(reference): Path<String>,
    Json(request): Json<AppealRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    desk.simulate_latency().await;
    let today = Local::now().date_naive();
    match desk.lookup().file_appeal(&reference, request, today) {
        Ok(record) => (StatusCode::OK, Json(StatusView::from(&record))).into_response(),
        Err(error) => lookup_error_response(error),
    }
}

pub(crate) async fn login_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if desk.session().login(&request.username, &request.password) {
        (StatusCode::OK, Json(json!({ "authenticated": true }))).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false, "error": "invalid credentials" })),
        )
            .into_response()
    }
}

pub(crate) async fn logout_handler<S, D>(State(desk): State<Desk<S, D>>) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    desk.session().logout();
    (StatusCode::OK, Json(json!({ "authenticated": false }))).into_response()
}

pub(crate) async fn review_list_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Query(query): Query<ReviewListQuery>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if !desk.session().is_authenticated() {
        return unauthorized();
    }

    let filter = match query.status.as_deref().unwrap_or("all").parse::<StatusFilter>() {
        Ok(filter) => filter,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    };

    match desk.review().list_filtered(filter) {
        Ok(records) => {
            let rows: Vec<ReviewRow> = records.into_iter().map(ReviewRow::from).collect();
            let payload = json!({ "filter": filter.to_string(), "submissions": rows });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => review_error_response(error),
    }
}

pub(crate) async fn review_counts_handler<S, D>(State(desk): State<Desk<S, D>>) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if !desk.session().is_authenticated() {
        return unauthorized();
    }

    match desk.review().counts() {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(error) => review_error_response(error),
    }
}

pub(crate) async fn review_detail_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(reference): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if !desk.session().is_authenticated() {
        return unauthorized();
    }

    match desk.review().get(&ComplaintId(reference)) {
        Ok(record) => (StatusCode::OK, Json(ReviewRow::from(record))).into_response(),
        Err(error) => review_error_response(error),
    }
}

pub(crate) async fn review_status_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(reference): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if !desk.session().is_authenticated() {
        return unauthorized();
    }

    match desk
        .review()
        .set_status(&ComplaintId(reference), request.decision)
    {
        Ok(record) => (StatusCode::OK, Json(ReviewRow::from(record))).into_response(),
        Err(error) => review_error_response(error),
    }
}

pub(crate) async fn review_delete_handler<S, D>(
    State(desk): State<Desk<S, D>>,
    Path(reference): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    D: CodeSender + 'static,
{
    if !desk.session().is_authenticated() {
        return unauthorized();
    }

    let id = ComplaintId(reference);
    match desk.review().delete(&id) {
        Ok(deleted) => {
            (StatusCode::OK, Json(json!({ "id": id, "deleted": deleted }))).into_response()
        }
        Err(error) => review_error_response(error),
    }
}
