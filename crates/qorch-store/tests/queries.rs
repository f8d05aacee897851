mod fixtures;

use std::collections::BTreeMap;

use qorch_core::{
    BatchStatus, ExecutionMode, JobHandle, MetricRecord, RawResultRecord, VariantId,
};
use qorch_store::{export_metrics_csv, export_metrics_json, MetricExportRow, Store};
use tempfile::tempdir;

use fixtures::{batch, variant};

fn raw(variant_id: VariantId) -> RawResultRecord {
    RawResultRecord {
        variant_id,
        mean: BTreeMap::from([("00".to_string(), 1.0)]),
        std_dev: BTreeMap::from([("00".to_string(), 0.0)]),
        circuit: String::new(),
        shots: 100,
        measure_mapping: BTreeMap::new(),
    }
}

fn metric(variant_id: VariantId, decode_error: Option<&str>) -> MetricRecord {
    MetricRecord {
        variant_id,
        total_gates: 4,
        one_qubit_gates: 3,
        two_qubit_gates: 1,
        depth: 2,
        success_rate: decode_error.is_none().then_some(0.95),
        accepted: None,
        logical_errors: None,
        undecided: None,
        detection_seconds: None,
        decoding_seconds: None,
        decode_error: decode_error.map(str::to_string),
    }
}

#[test]
fn awaiting_submission_excludes_dispatched_batches() {
    let mut store = Store::open_in_memory().expect("store");
    let first = store
        .insert_batch(&batch(ExecutionMode::Remote, 1), &[variant("a")])
        .expect("first");
    let second = store
        .insert_batch(&batch(ExecutionMode::Local, 1), &[variant("b")])
        .expect("second");
    store
        .mark_submitted(first, &JobHandle::new("job-1"))
        .expect("submit");
    let waiting: Vec<_> = store
        .batches_awaiting_submission()
        .expect("waiting")
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(waiting, vec![second]);
    let by_handle = store
        .pending_batches_for_handle(&JobHandle::new("job-1"))
        .expect("by handle");
    assert_eq!(by_handle.len(), 1);
    assert!(store
        .pending_batches_for_handle(&JobHandle::new("job-9"))
        .expect("none")
        .is_empty());
}

#[test]
fn awaiting_results_skips_variants_with_raw_results() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(
            &batch(ExecutionMode::Local, 1),
            &[variant("a"), variant("b"), variant("c")],
        )
        .expect("insert");
    // Only pending batches have outstanding variants.
    assert!(store.variants_awaiting_results(id).expect("none").is_empty());
    store.mark_submitted(id, &JobHandle::local()).expect("submit");
    let variants = store.variants_for_batch(id).expect("variants");
    store.upsert_raw_result(&raw(variants[1].id)).expect("raw");
    let waiting: Vec<_> = store
        .variants_awaiting_results(id)
        .expect("waiting")
        .into_iter()
        .map(|v| v.circuit_name)
        .collect();
    assert_eq!(waiting, vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn pending_metrics_includes_decode_failures() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(
            &batch(ExecutionMode::Remote, 1),
            &[variant("a"), variant("b"), variant("c")],
        )
        .expect("insert");
    let variants = store.variants_for_batch(id).expect("variants");
    for v in &variants {
        store.upsert_raw_result(&raw(v.id)).expect("raw");
    }
    store.upsert_metric(&metric(variants[0].id, None)).expect("a");
    store
        .upsert_metric(&metric(variants[1].id, Some("bad width")))
        .expect("b");
    let pending: Vec<_> = store
        .variants_pending_metrics(id)
        .expect("pending")
        .into_iter()
        .map(|v| v.circuit_name)
        .collect();
    assert_eq!(pending, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn summaries_count_children_per_batch() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(
            &batch(ExecutionMode::Remote, 1),
            &[variant("a"), variant("b")],
        )
        .expect("insert");
    store.mark_submitted(id, &JobHandle::new("job-1")).expect("submit");
    let variants = store.variants_for_batch(id).expect("variants");
    let records: Vec<_> = variants.iter().map(|v| raw(v.id)).collect();
    store.record_batch_results(id, &records).expect("results");
    store.upsert_metric(&metric(variants[0].id, None)).expect("metric");
    let summaries = store.batch_summaries().expect("summaries");
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.status, BatchStatus::Executed);
    assert_eq!(
        (summary.variants, summary.raw_results, summary.metrics),
        (2, 2, 1)
    );
    assert_eq!(store.executed_batches().expect("executed").len(), 1);
}

#[test]
fn metric_exports_agree() {
    let mut store = Store::open_in_memory().expect("store");
    let id = store
        .insert_batch(
            &batch(ExecutionMode::Remote, 1),
            &[variant("a"), variant("b")],
        )
        .expect("insert");
    let variants = store.variants_for_batch(id).expect("variants");
    for v in &variants {
        store.upsert_raw_result(&raw(v.id)).expect("raw");
        store.upsert_metric(&metric(v.id, None)).expect("metric");
    }
    let dir = tempdir().expect("dir");
    let json_path = dir.path().join("metrics.json");
    let csv_path = dir.path().join("metrics.csv");
    export_metrics_json(&store, Some(id), &json_path).expect("json");
    export_metrics_csv(&store, None, &csv_path).expect("csv");

    let rows: Vec<MetricExportRow> =
        serde_json::from_slice(&std::fs::read(&json_path).expect("read json")).expect("parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].circuit_name, "a");

    let mut reader = csv::Reader::from_path(&csv_path).expect("csv reader");
    let records: Vec<_> = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(&records[1][3], "b");
    assert_eq!(&records[1][11], "0.95");
}
