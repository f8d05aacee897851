mod fixtures;

use std::collections::BTreeMap;

use qorch_core::{ExecutionMode, JobHandle, MetricRecord, RawResultRecord, VariantId};
use qorch_store::Store;
use tempfile::NamedTempFile;

use fixtures::{batch, variant};

fn raw(variant_id: VariantId, p: f64) -> RawResultRecord {
    RawResultRecord {
        variant_id,
        mean: BTreeMap::from([("00".to_string(), p), ("11".to_string(), 1.0 - p)]),
        std_dev: BTreeMap::from([("00".to_string(), 0.0), ("11".to_string(), 0.0)]),
        circuit: "OPENQASM 2.0;".into(),
        shots: 100,
        measure_mapping: BTreeMap::from([(0, 0), (1, 1)]),
    }
}

fn metric(variant_id: VariantId, total: u64) -> MetricRecord {
    MetricRecord {
        variant_id,
        total_gates: total,
        one_qubit_gates: 0,
        two_qubit_gates: total,
        depth: total,
        success_rate: None,
        accepted: None,
        logical_errors: None,
        undecided: None,
        detection_seconds: None,
        decoding_seconds: None,
        decode_error: Some("decoder offline".into()),
    }
}

#[test]
fn insert_batch_preserves_variant_order() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(
            &batch(ExecutionMode::Remote, 2),
            &[variant("c"), variant("a"), variant("b")],
        )
        .expect("insert");
    let names: Vec<_> = store
        .variants_for_batch(id)
        .expect("variants")
        .into_iter()
        .map(|v| (v.ordinal, v.circuit_name))
        .collect();
    assert_eq!(
        names,
        vec![(0, "c".to_string()), (1, "a".to_string()), (2, "b".to_string())]
    );
    let record = store.batch(id).expect("read").expect("exists");
    assert_eq!(record.runs, 2);
    assert!(record.handle.is_none());
}

#[test]
fn empty_batch_is_rejected_and_nothing_written() {
    let mut store = Store::open_in_memory().expect("store");
    let err = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[])
        .expect_err("empty batch");
    assert_eq!(err.info().code, "qorch_store.empty_batch");
    assert!(store.batch_summaries().expect("summaries").is_empty());
}

#[test]
fn raw_result_upsert_is_idempotent() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    let v = store.variants_for_batch(id).expect("variants")[0].id;
    store.upsert_raw_result(&raw(v, 0.5)).expect("first");
    store.upsert_raw_result(&raw(v, 0.5)).expect("second");
    store.upsert_raw_result(&raw(v, 0.75)).expect("update");
    let count: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM raw_results", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 1);
    let stored = store.raw_result(v).expect("read").expect("present");
    assert_eq!(stored, raw(v, 0.75));
}

#[test]
fn metric_upsert_replaces_decode_error() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("insert");
    let v = store.variants_for_batch(id).expect("variants")[0].id;
    store.upsert_metric(&metric(v, 3)).expect("first");
    assert_eq!(store.decode_failures(id).expect("failures"), 1);
    let mut fixed = metric(v, 3);
    fixed.decode_error = None;
    fixed.success_rate = Some(0.9);
    store.upsert_metric(&fixed).expect("second");
    assert_eq!(store.metric(v).expect("read"), Some(fixed));
    assert_eq!(store.decode_failures(id).expect("failures"), 0);
}

#[test]
fn records_survive_reopen() {
    let db = NamedTempFile::new().expect("db");
    let id = {
        let mut store = Store::open(db.path()).expect("open");
        let id = store
            .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
            .expect("insert");
        store
            .mark_submitted(id, &JobHandle::new("job-1"))
            .expect("submit");
        id
    };
    let store = Store::open(db.path()).expect("reopen");
    let record = store.batch(id).expect("read").expect("exists");
    assert_eq!(record.handle, Some(JobHandle::new("job-1")));
    assert_eq!(store.pending_batches().expect("pending").len(), 1);
}
