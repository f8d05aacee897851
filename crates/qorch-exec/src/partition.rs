use qorch_core::errors::{ErrorInfo, QorchError};

/// Splits a flat result list into one contiguous group of `runs` entries per variant,
/// preserving submission order.
pub fn partition_runs<T>(
    flat: Vec<T>,
    variants: usize,
    runs: usize,
) -> Result<Vec<Vec<T>>, QorchError> {
    let expected = variants.checked_mul(runs);
    if runs == 0 || variants == 0 || expected != Some(flat.len()) {
        return Err(QorchError::Partition(
            ErrorInfo::new(
                "qorch_exec.partition_mismatch",
                "result count does not match variants x runs",
            )
            .with_context("results", flat.len())
            .with_context("variants", variants)
            .with_context("runs", runs),
        ));
    }
    let mut groups = Vec::with_capacity(variants);
    let mut iter = flat.into_iter();
    for _ in 0..variants {
        groups.push(iter.by_ref().take(runs).collect());
    }
    Ok(groups)
}
