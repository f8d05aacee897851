use qorch_core::errors::{ErrorInfo, QorchError, STALE_TRANSITION};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("batch_id", 7)
        .with_context("handle", "job-abc")
}

#[test]
fn store_error_surface() {
    let err = QorchError::Store(sample_info("S001", "locked"));
    assert_eq!(err.info().code, "S001");
    assert_eq!(err.info().context.get("batch_id").map(String::as_str), Some("7"));
}

#[test]
fn partition_error_surface() {
    let err = QorchError::Partition(sample_info("P001", "uneven result list"));
    assert_eq!(err.info().code, "P001");
    assert!(err.info().context.contains_key("handle"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = QorchError::Backend(sample_info("B001", "submit failed").with_hint("check token"));
    let text = err.to_string();
    assert!(text.starts_with("backend error: submit failed (code: B001)"));
    assert!(text.contains("batch_id=7, handle=job-abc"));
    assert!(text.ends_with("| hint: check token"));
}

#[test]
fn stale_transition_is_recognised() {
    let stale = QorchError::Transition(ErrorInfo::new(STALE_TRANSITION, "lost race"));
    let illegal = QorchError::Transition(ErrorInfo::new("qorch_core.illegal_transition", "no"));
    assert!(stale.is_stale_transition());
    assert!(!illegal.is_stale_transition());
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = QorchError::Decode(ErrorInfo::new("D001", "width table miss"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Decode");
    assert_eq!(json["detail"]["code"], "D001");
}
