use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::common::*;
use crate::workflows::complaints::domain::ComplaintType;
use crate::workflows::complaints::store::InMemorySubmissionStore;
use crate::workflows::complaints::wizard::{IntakeError, WizardStep};

#[test]
fn idle_intakes_are_dropped() {
    let (desk, _) = build_desk_with(
        Arc::new(InMemorySubmissionStore::new()),
        Duration::from_millis(50),
    );

    let (abandoned, _) = desk.start_intake(ComplaintType::Client).expect("first intake");
    thread::sleep(Duration::from_millis(120));
    let (fresh, _) = desk.start_intake(ComplaintType::Employee).expect("second intake");

    assert_eq!(desk.open_intakes().expect("count"), 1);
    match desk.with_wizard(&abandoned, |_, wizard| Ok(wizard.step())) {
        Err(IntakeError::SessionNotFound) => {}
        other => panic!("expected the idle intake to be gone, got {other:?}"),
    }
    let (step, _) = desk
        .with_wizard(&fresh, |_, wizard| Ok(wizard.step()))
        .expect("fresh intake stays open");
    assert_eq!(step, WizardStep::Charter);
}

#[test]
fn closed_intakes_are_forgotten() {
    let (desk, _) = build_desk(Arc::new(InMemorySubmissionStore::new()));
    let (session_id, _) = desk.start_intake(ComplaintType::External).expect("intake");
    assert_eq!(desk.open_intakes().expect("count"), 1);

    desk.close_intake(&session_id).expect("close");
    assert_eq!(desk.open_intakes().expect("count"), 0);
}

#[test]
fn other_intakes_stay_usable_while_one_is_busy() {
    let (desk, _) = build_desk(Arc::new(InMemorySubmissionStore::new()));
    let (busy, _) = desk.start_intake(ComplaintType::Client).expect("busy intake");
    let (other, _) = desk.start_intake(ComplaintType::Employee).expect("other intake");

    let (inner, snapshot) = desk
        .with_wizard(&busy, |service, wizard| {
            service.accept_charter(wizard, true)?;
            let (_, started) = desk.start_intake(ComplaintType::External)?;
            let (other_step, _) = desk.with_wizard(&other, |_, other| Ok(other.step()))?;
            Ok((started, other_step))
        })
        .expect("nested session access");

    assert_eq!(inner.1, WizardStep::Charter);
    assert_eq!(inner.0.step, WizardStep::Charter);
    assert_eq!(snapshot.step, WizardStep::Verification);
    assert_eq!(desk.open_intakes().expect("count"), 3);
}
