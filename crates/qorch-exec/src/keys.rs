//! Measured-state key conversions.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{Distribution, KeyFormat, OutcomeCounts};

/// True for non-empty strings made only of `0` and `1`.
pub fn is_binary_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b == b'0' || b == b'1')
}

/// Rewrites bitstring keys as decimal strings. Keys that are not bitstrings are dropped;
/// keys that collide after conversion are summed.
pub fn binary_to_decimal<V>(entries: &BTreeMap<String, V>) -> BTreeMap<String, V>
where
    V: Copy + Default + AddAssign,
{
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        if !is_binary_key(key) {
            continue;
        }
        let Ok(parsed) = u128::from_str_radix(key, 2) else {
            continue;
        };
        *out.entry(parsed.to_string()).or_insert_with(V::default) += *value;
    }
    out
}

/// Applies the configured key format to backend-reported counts.
pub fn canonicalize_counts(counts: &OutcomeCounts, format: KeyFormat) -> OutcomeCounts {
    match format {
        KeyFormat::Binary => counts.clone(),
        KeyFormat::Integer => binary_to_decimal(counts),
    }
}

fn key_value(key: &str, format: KeyFormat) -> Result<u128, QorchError> {
    let parsed = match format {
        KeyFormat::Binary if is_binary_key(key) => u128::from_str_radix(key, 2).ok(),
        KeyFormat::Binary => None,
        KeyFormat::Integer => key.parse::<u128>().ok(),
    };
    parsed.ok_or_else(|| {
        QorchError::Decode(
            ErrorInfo::new("qorch_exec.key_parse", "measured-state key is not a valid outcome")
                .with_context("key", key),
        )
    })
}

/// Rewrites keys stored in `format` as zero-padded bitstrings at least `width` long.
pub fn to_fixed_width<V>(
    entries: &BTreeMap<String, V>,
    width: usize,
    format: KeyFormat,
) -> Result<BTreeMap<String, V>, QorchError>
where
    V: Copy + Default + AddAssign,
{
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        let outcome = key_value(key, format)?;
        *out.entry(format!("{outcome:0width$b}"))
            .or_insert_with(V::default) += *value;
    }
    Ok(out)
}

/// Reverses the character order of every key.
pub fn reverse_keys<V: Copy>(entries: &BTreeMap<String, V>) -> BTreeMap<String, V> {
    entries
        .iter()
        .map(|(key, value)| (key.chars().rev().collect(), *value))
        .collect()
}

/// Rebuilds integer counts from a distribution. Values already summing above one are
/// treated as counts and only rounded.
pub fn counts_from_probabilities(distribution: &Distribution, shots: u32) -> OutcomeCounts {
    let total: f64 = distribution.values().sum();
    let scale = if total.round() <= 1.0 { f64::from(shots) } else { 1.0 };
    distribution
        .iter()
        .map(|(key, p)| (key.clone(), (p * scale).round().max(0.0) as u64))
        .collect()
}
