use compensator::*;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

type Trail = Rc<RefCell<Vec<String>>>;

fn trail() -> Trail {
    Rc::new(RefCell::new(Vec::new()))
}

// Compensation that appends its name to the shared trail
fn push(trail: &Trail, name: &str) -> impl FnOnce() -> Result<(), ActionError> {
    let trail = Rc::clone(trail);
    let name = name.to_string();
    move || {
        trail.borrow_mut().push(name);
        Ok(())
    }
}

// Compensation that records its name and then fails
fn fail(trail: &Trail, name: &str) -> impl FnOnce() -> Result<(), ActionError> {
    let trail = Rc::clone(trail);
    let name = name.to_string();
    move || {
        trail.borrow_mut().push(name.clone());
        Err(format!("{} could not be undone", name).into())
    }
}

fn details(value: serde_json::Value) -> Details {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_depth_tracks_unmatched_begins() {
    let mut coordinator = TransactionCoordinator::new();
    for n in 1..=5 {
        coordinator.begin();
        assert_eq!(coordinator.depth(), n);
    }

    coordinator.commit().unwrap();
    coordinator.rollback().unwrap();
    assert_eq!(coordinator.depth(), 3);
    assert_eq!(coordinator.transaction_log().len(), 5);
}

#[test]
fn test_compensations_run_last_registered_first() {
    let trail = trail();
    let mut coordinator = TransactionCoordinator::new();

    coordinator.begin();
    coordinator.add_rollback_action(push(&trail, "A")).unwrap();
    coordinator.add_rollback_action(push(&trail, "B")).unwrap();
    coordinator.add_rollback_action(push(&trail, "C")).unwrap();
    coordinator.rollback().unwrap();

    assert_eq!(*trail.borrow(), vec!["C", "B", "A"]);
}

#[test]
fn test_commit_discards_compensations() {
    let trail = trail();
    let mut coordinator = TransactionCoordinator::new();

    coordinator.begin();
    coordinator.add_rollback_action(push(&trail, "A")).unwrap();
    coordinator.commit().unwrap();

    // Nothing left on the stack for a later rollback to reach
    coordinator.rollback().unwrap();
    coordinator.begin();
    coordinator.rollback().unwrap();

    assert!(trail.borrow().is_empty());
    assert_eq!(coordinator.transaction_log()[0].status, FrameStatus::Committed);
}

#[test]
fn test_failing_compensation_halts_rollback() {
    let trail = trail();
    let mut coordinator = TransactionCoordinator::new();

    let id = coordinator.begin();
    coordinator.add_rollback_action(push(&trail, "A")).unwrap();
    coordinator.add_rollback_action(fail(&trail, "B")).unwrap();
    coordinator.add_rollback_action(push(&trail, "C")).unwrap();

    let err = coordinator.rollback().unwrap_err();

    assert_eq!(*trail.borrow(), vec!["C", "B"]);
    match err {
        TransactionError::RollbackFailure { frame_id, index, skipped, ref source } => {
            assert_eq!(frame_id, id);
            assert_eq!(index, 1);
            assert_eq!(skipped, 1);
            assert_eq!(source.to_string(), "B could not be undone");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Status was recorded before the compensations ran
    let frame = coordinator.frame(id).unwrap();
    assert_eq!(frame.status, FrameStatus::RolledBack);
    assert!(frame.end_time.is_some());
    assert_eq!(coordinator.depth(), 0);
    assert_eq!(coordinator.events().filter_by_level(LogLevel::Error).len(), 1);
}

#[test]
fn test_empty_stack_operations_are_inert() {
    let mut coordinator = TransactionCoordinator::new();

    assert!(coordinator.commit().is_ok());
    assert!(coordinator.rollback().is_ok());
    assert!(coordinator.add_action("update", details(json!({"id": 1}))).is_ok());
    assert!(coordinator.add_rollback_action(|| Ok(())).is_ok());

    assert!(coordinator.transaction_log().is_empty());
    assert_eq!(coordinator.depth(), 0);
}

#[test]
fn test_closed_frames_are_untouched_by_empty_stack_calls() {
    let mut coordinator = TransactionCoordinator::new();
    coordinator.begin();
    coordinator.commit().unwrap();
    let before = coordinator.transaction_log().to_vec();

    coordinator.commit().unwrap();
    coordinator.rollback().unwrap();

    assert_eq!(coordinator.transaction_log(), before.as_slice());
}

#[test]
fn test_audit_entries_recorded_in_order() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap());
    let mut coordinator = TransactionCoordinator::builder().with_clock(clock.clone()).build();

    let id = coordinator.begin();
    clock.advance(Duration::seconds(1));
    coordinator.add_action("create", details(json!({"user": "alice"}))).unwrap();
    clock.advance(Duration::seconds(1));
    coordinator.add_rollback_action(|| Ok(())).unwrap();

    let frame = coordinator.frame(id).unwrap();
    assert_eq!(frame.audit_entries.len(), 2);
    assert_eq!(frame.audit_entries[0].kind, "create");
    assert_eq!(frame.audit_entries[0].detail.as_ref().unwrap()["user"], json!("alice"));
    assert_eq!(frame.audit_entries[1].kind, ROLLBACK_ACTION_KIND);
    assert!(frame.audit_entries[1].detail.is_none());
    assert!(frame.audit_entries[0].timestamp < frame.audit_entries[1].timestamp);
    assert_eq!(frame.rollback_action_count(), 1);
}

#[test]
fn test_audit_goes_to_top_frame_only() {
    let mut coordinator = TransactionCoordinator::new();

    let outer = coordinator.begin();
    coordinator.add_action("outer", Details::new()).unwrap();
    let inner = coordinator.begin();
    coordinator.add_action("inner", Details::new()).unwrap();
    coordinator.commit().unwrap();
    coordinator.add_action("outer-again", Details::new()).unwrap();

    let kinds = |id| {
        coordinator
            .frame(id)
            .unwrap()
            .audit_entries
            .iter()
            .map(|e| e.kind.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(outer), vec!["outer", "outer-again"]);
    assert_eq!(kinds(inner), vec!["inner"]);
}

#[test]
fn test_backwards_clock_does_not_precede_start() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap());
    let mut coordinator = TransactionCoordinator::builder().with_clock(clock.clone()).build();

    let id = coordinator.begin();
    clock.advance(Duration::minutes(-10));
    coordinator.add_action("skewed", Details::new()).unwrap();
    coordinator.commit().unwrap();

    let frame = coordinator.frame(id).unwrap();
    assert_eq!(frame.audit_entries[0].timestamp, frame.start_time);
    assert!(frame.end_time.unwrap() >= frame.start_time);
}

#[test]
fn test_custom_compensating_action() {
    struct Restore {
        target: Rc<RefCell<i64>>,
        previous: i64,
    }

    impl CompensatingAction for Restore {
        fn compensate(self: Box<Self>) -> Result<(), ActionError> {
            *self.target.borrow_mut() = self.previous;
            Ok(())
        }
    }

    let balance = Rc::new(RefCell::new(100));
    let mut coordinator = TransactionCoordinator::new();

    coordinator.begin();
    coordinator
        .add_compensation(Restore { target: Rc::clone(&balance), previous: 100 })
        .unwrap();
    *balance.borrow_mut() = 40;
    coordinator.rollback().unwrap();

    assert_eq!(*balance.borrow(), 100);
}

#[test]
fn test_infallible_adapter() {
    let hits = Rc::new(RefCell::new(0));
    let mut coordinator = TransactionCoordinator::new();

    coordinator.begin();
    let counter = Rc::clone(&hits);
    coordinator
        .add_rollback_action(infallible(move || *counter.borrow_mut() += 1))
        .unwrap();
    assert_eq!(coordinator.pending_compensations(), 1);
    coordinator.rollback().unwrap();

    assert_eq!(*hits.borrow(), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Begin,
    Commit,
    Rollback,
    Action,
    Compensation,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Begin),
        Just(Op::Commit),
        Just(Op::Rollback),
        Just(Op::Action),
        Just(Op::Compensation),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Stack depth always equals begins minus matched closes
    #[test]
    fn property_depth_matches_unclosed_begins(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut coordinator = TransactionCoordinator::new();
        let mut expected = 0usize;

        for op in ops {
            match op {
                Op::Begin => { coordinator.begin(); expected += 1; }
                Op::Commit => { coordinator.commit().unwrap(); expected = expected.saturating_sub(1); }
                Op::Rollback => { coordinator.rollback().unwrap(); expected = expected.saturating_sub(1); }
                Op::Action => { coordinator.add_action("op", Details::new()).unwrap(); }
                Op::Compensation => { coordinator.add_rollback_action(|| Ok(())).unwrap(); }
            }
            prop_assert_eq!(coordinator.depth(), expected);
        }
    }

    /// Every audit call on an open frame yields exactly one entry, never before the frame started
    #[test]
    fn property_audit_completeness(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut coordinator = TransactionCoordinator::new();
        let mut expected: std::collections::HashMap<FrameId, usize> = Default::default();

        for op in ops {
            match op {
                Op::Begin => { expected.insert(coordinator.begin(), 0); }
                Op::Commit => { coordinator.commit().unwrap(); }
                Op::Rollback => { coordinator.rollback().unwrap(); }
                Op::Action | Op::Compensation => {
                    if let Some(id) = coordinator.current_frame_id() {
                        *expected.entry(id).or_default() += 1;
                    }
                    if matches!(op, Op::Action) {
                        coordinator.add_action("op", Details::new()).unwrap();
                    } else {
                        coordinator.add_rollback_action(|| Ok(())).unwrap();
                    }
                }
            }
        }

        for frame in coordinator.transaction_log() {
            prop_assert_eq!(frame.audit_entries.len(), expected[&frame.id]);
            for entry in &frame.audit_entries {
                prop_assert!(entry.timestamp >= frame.start_time);
            }
            prop_assert_eq!(frame.end_time.is_some(), frame.status != FrameStatus::InProgress);
        }
    }

    /// Rollback replays exactly the reverse of registration order
    #[test]
    fn property_rollback_is_reverse_order(count in 0usize..30) {
        let trail = trail();
        let mut coordinator = TransactionCoordinator::new();
        coordinator.begin();
        for i in 0..count {
            coordinator.add_rollback_action(push(&trail, &i.to_string())).unwrap();
        }
        coordinator.rollback().unwrap();

        let expected: Vec<String> = (0..count).rev().map(|i| i.to_string()).collect();
        prop_assert_eq!(trail.borrow().clone(), expected);
    }
}
