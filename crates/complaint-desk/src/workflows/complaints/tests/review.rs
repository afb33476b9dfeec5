use super::common::*;
use crate::workflows::complaints::domain::{
    AppealData, ComplaintId, ComplaintStatus, ReviewDecision, StatusLabel,
};
use crate::workflows::complaints::lookup::{AppealRequest, StatusLookup};
use crate::workflows::complaints::review::{ReviewError, ReviewPanel, StatusCounts, StatusFilter};
use crate::workflows::complaints::store::SubmissionStore;

fn id(raw: &str) -> ComplaintId {
    ComplaintId(raw.to_string())
}

fn mixed_store() -> std::sync::Arc<crate::workflows::complaints::store::InMemorySubmissionStore> {
    seeded_store(vec![
        record("REF-1001", ComplaintStatus::Pending),
        record("REF-1002", ComplaintStatus::Accepted),
        record("REF-1003", ComplaintStatus::Pending),
        record("REF-1004", ComplaintStatus::Declined),
        record("REF-1005", ComplaintStatus::Appeal),
    ])
}

#[test]
fn listing_keeps_insertion_order_and_filters_by_status() {
    let panel = ReviewPanel::new(mixed_store());

    let all: Vec<_> = panel
        .list_filtered(StatusFilter::All)
        .expect("list")
        .into_iter()
        .map(|record| record.id.0)
        .collect();
    assert_eq!(
        all,
        vec!["REF-1001", "REF-1002", "REF-1003", "REF-1004", "REF-1005"]
    );

    let pending: Vec<_> = panel
        .list_filtered(StatusFilter::Only(ComplaintStatus::Pending))
        .expect("list")
        .into_iter()
        .map(|record| record.id.0)
        .collect();
    assert_eq!(pending, vec!["REF-1001", "REF-1003"]);
}

#[test]
fn filters_parse_from_query_values() {
    assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!(
        "appeal".parse::<StatusFilter>(),
        Ok(StatusFilter::Only(ComplaintStatus::Appeal))
    );
    assert!("archived".parse::<StatusFilter>().is_err());
    assert_eq!(StatusFilter::Only(ComplaintStatus::Declined).to_string(), "declined");
}

#[test]
fn counts_cover_every_status() {
    let panel = ReviewPanel::new(mixed_store());
    assert_eq!(
        panel.counts().expect("counts"),
        StatusCounts {
            total: 5,
            pending: 2,
            accepted: 1,
            declined: 1,
            appeal: 1,
        }
    );
}

#[test]
fn pending_and_appeal_records_can_be_decided() {
    let store = mixed_store();
    let panel = ReviewPanel::new(store.clone());

    let accepted = panel
        .set_status(&id("REF-1001"), ReviewDecision::Accept)
        .expect("accept pending");
    assert_eq!(accepted.status, ComplaintStatus::Accepted);

    let declined = panel
        .set_status(&id("REF-1005"), ReviewDecision::Decline)
        .expect("decline appeal");
    assert_eq!(declined.status, ComplaintStatus::Declined);

    let stored = store.list().expect("list");
    assert_eq!(stored[0].status, ComplaintStatus::Accepted);
    assert_eq!(stored[4].status, ComplaintStatus::Declined);
}

#[test]
fn repeated_decisions_are_no_ops_and_reversals_are_rejected() {
    let store = mixed_store();
    let mut events = store.subscribe();
    let panel = ReviewPanel::new(store.clone());

    let same = panel
        .set_status(&id("REF-1002"), ReviewDecision::Accept)
        .expect("re-accept");
    assert_eq!(same.status, ComplaintStatus::Accepted);
    assert!(events.try_recv().is_err(), "no-op must not publish");

    match panel.set_status(&id("REF-1002"), ReviewDecision::Decline) {
        Err(ReviewError::InvalidTransition { from, to }) => {
            assert_eq!(from, ComplaintStatus::Accepted);
            assert_eq!(to, ComplaintStatus::Declined);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    match panel.set_status(&id("REF-1004"), ReviewDecision::Accept) {
        Err(ReviewError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn unknown_references_are_not_found() {
    let panel = ReviewPanel::new(mixed_store());
    match panel.set_status(&id("REF-9999"), ReviewDecision::Accept) {
        Err(ReviewError::NotFound(missing)) => assert_eq!(missing, id("REF-9999")),
        other => panic!("expected not found, got {other:?}"),
    }
    match panel.get(&id("REF-9999")) {
        Err(ReviewError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn delete_is_unconditional_and_idempotent() {
    let store = mixed_store();
    let panel = ReviewPanel::new(store.clone());

    assert!(panel.delete(&id("REF-1002")).expect("delete accepted"));
    assert!(!panel.delete(&id("REF-1002")).expect("second delete"));
    assert!(!panel.delete(&id("REF-4242")).expect("unknown delete"));
    assert_eq!(panel.counts().expect("counts").total, 4);
}

#[test]
fn second_decline_after_appeal_is_final() {
    let store = seeded_store(vec![record("REF-2000", ComplaintStatus::Pending)]);
    let panel = ReviewPanel::new(store.clone());
    let lookup = StatusLookup::new(store);

    panel
        .set_status(&id("REF-2000"), ReviewDecision::Decline)
        .expect("first decline");
    lookup
        .file_appeal(
            "REF-2000",
            AppealRequest {
                reason: "New evidence".to_string(),
                evidence: None,
            },
            today(),
        )
        .expect("appeal");
    let final_record = panel
        .set_status(&id("REF-2000"), ReviewDecision::Decline)
        .expect("second decline");

    assert_eq!(final_record.status_label(), StatusLabel::DeclinedFinal);
    assert!(!final_record.appeal_available());
    assert_eq!(
        final_record.appeal,
        Some(AppealData {
            reason: "New evidence".to_string(),
            evidence: None,
            date: today(),
        })
    );
}

#[test]
fn decisions_apply_to_the_stored_record_not_an_outdated_read() {
    let store = seeded_store(vec![record("REF-2000", ComplaintStatus::Pending)]);
    let outdated = store.list().expect("snapshot");
    ReviewPanel::new(store.clone())
        .set_status(&id("REF-2000"), ReviewDecision::Accept)
        .expect("accept");

    let racing = ReviewPanel::new(std::sync::Arc::new(StaleReads::new(store.clone(), outdated)));
    match racing.set_status(&id("REF-2000"), ReviewDecision::Decline) {
        Err(ReviewError::InvalidTransition { from, to }) => {
            assert_eq!(from, ComplaintStatus::Accepted);
            assert_eq!(to, ComplaintStatus::Declined);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert_eq!(
        store.list().expect("list")[0].status,
        ComplaintStatus::Accepted
    );
}
