//! Error-correction code families encoded in circuit names.
//!
//! `polar_all_meas_n<k>[_<basis>]` names an all-measurement experiment and
//! `polar_n<k>[_<basis>]` a state-preparation experiment. The basis defaults to `Z`.

use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::Basis;
use serde::{Deserialize, Serialize};

const ALL_MEASUREMENT_MARKER: &str = "polar_all_meas";
const PREPARATION_MARKER: &str = "polar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeFamily {
    /// Every qubit is measured; decoded with [`qorch_core::Decoder::decode`].
    AllMeasurement,
    /// Logical state preparation; scored with [`qorch_core::Decoder::score`].
    Preparation,
}

/// Code parameters parsed from a circuit name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSpec {
    pub family: CodeFamily,
    pub n: u32,
    pub basis: Basis,
}

fn name_error(message: &str, name: &str) -> QorchError {
    QorchError::Decode(
        ErrorInfo::new("qorch_exec.code_name", message).with_context("circuit_name", name),
    )
}

impl CodeSpec {
    /// `Ok(None)` when the name carries no family marker.
    pub fn parse(circuit_name: &str) -> Result<Option<Self>, QorchError> {
        let (family, rest) = if let Some(pos) = circuit_name.find(ALL_MEASUREMENT_MARKER) {
            (
                CodeFamily::AllMeasurement,
                &circuit_name[pos + ALL_MEASUREMENT_MARKER.len()..],
            )
        } else if let Some(pos) = circuit_name.find(PREPARATION_MARKER) {
            (
                CodeFamily::Preparation,
                &circuit_name[pos + PREPARATION_MARKER.len()..],
            )
        } else {
            return Ok(None);
        };
        let mut tokens = rest.split('_').filter(|token| !token.is_empty());
        let size = tokens
            .next()
            .ok_or_else(|| name_error("code name has no size token", circuit_name))?;
        let n = size
            .get(1..)
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or_else(|| name_error("code size token is not numeric", circuit_name))?;
        let basis = match tokens.next() {
            Some(label) => label.parse::<Basis>()?,
            None => Basis::Z,
        };
        Ok(Some(Self { family, n, basis }))
    }

    /// Number of measured bits the decoder expects.
    pub fn width(&self) -> Result<usize, QorchError> {
        let width = match (self.family, self.basis, self.n) {
            (CodeFamily::AllMeasurement, Basis::X, 2) => 8,
            (CodeFamily::AllMeasurement, Basis::X, 3) => 20,
            (CodeFamily::AllMeasurement, Basis::X, 4) => 40,
            (CodeFamily::AllMeasurement, Basis::Z, 2) => 6,
            (CodeFamily::AllMeasurement, Basis::Z, 3) => 12,
            (CodeFamily::AllMeasurement, Basis::Z, 4) => 48,
            (CodeFamily::Preparation, Basis::X, 2) => 4,
            (CodeFamily::Preparation, Basis::X, 3) => 12,
            (CodeFamily::Preparation, Basis::X, 4) => 24,
            (CodeFamily::Preparation, Basis::Z, 2) => 0,
            (CodeFamily::Preparation, Basis::Z, 3) => 4,
            (CodeFamily::Preparation, Basis::Z, 4) => 32,
            _ => {
                return Err(QorchError::Decode(
                    ErrorInfo::new("qorch_exec.code_width", "no register width for code size")
                        .with_context("n", self.n)
                        .with_context("basis", self.basis),
                ))
            }
        };
        Ok(width)
    }
}
