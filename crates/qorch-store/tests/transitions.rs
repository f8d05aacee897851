mod fixtures;

use std::collections::BTreeMap;

use qorch_core::{BatchStatus, ExecutionMode, JobHandle, RawResultRecord};
use qorch_store::Store;

use fixtures::{batch, variant};

#[test]
fn illegal_transition_is_rejected_without_touching_the_row() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    let err = store
        .transition(id, BatchStatus::Unsubmitted, BatchStatus::Done)
        .expect_err("illegal");
    assert!(matches!(err, qorch_core::QorchError::Transition(_)));
    assert!(!err.is_stale_transition());
    let record = store.batch(id).expect("read").expect("exists");
    assert_eq!(record.status, BatchStatus::Unsubmitted);
}

#[test]
fn lost_race_is_reported_as_stale() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    store
        .mark_submitted(id, &JobHandle::new("job-1"))
        .expect("submit");
    store
        .transition(id, BatchStatus::Pending, BatchStatus::Error)
        .expect("error");
    let err = store
        .transition(id, BatchStatus::Pending, BatchStatus::Executed)
        .expect_err("stale");
    assert!(err.is_stale_transition());
    assert_eq!(err.info().context.get("batch_id"), Some(&id.to_string()));
}

#[test]
fn mark_submitted_only_once() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    store
        .mark_submitted(id, &JobHandle::new("job-1"))
        .expect("first");
    let err = store
        .mark_submitted(id, &JobHandle::new("job-2"))
        .expect_err("second");
    assert!(err.is_stale_transition());
    let record = store.batch(id).expect("read").expect("exists");
    assert_eq!(record.handle, Some(JobHandle::new("job-1")));
}

#[test]
fn unknown_batch_is_a_store_error() {
    let store = Store::open_in_memory().expect("store");
    let err = store
        .transition(
            qorch_core::BatchId::from_raw(99),
            BatchStatus::Pending,
            BatchStatus::Executed,
        )
        .expect_err("missing");
    assert_eq!(err.info().code, "qorch_store.batch_missing");
}

#[test]
fn record_batch_results_rolls_back_when_batch_not_pending() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    let v = store.variants_for_batch(id).expect("variants")[0].id;
    let record = RawResultRecord {
        variant_id: v,
        mean: BTreeMap::from([("00".to_string(), 1.0)]),
        std_dev: BTreeMap::from([("00".to_string(), 0.0)]),
        circuit: String::new(),
        shots: 100,
        measure_mapping: BTreeMap::new(),
    };
    let err = store
        .record_batch_results(id, &[record])
        .expect_err("not pending");
    assert!(err.is_stale_transition());
    assert!(store.raw_result(v).expect("read").is_none());
}
