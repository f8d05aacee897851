//! Structural analysis of OpenQASM 2 circuit text.

use std::collections::BTreeMap;

use qorch_core::errors::{ErrorInfo, QorchError};
use serde::{Deserialize, Serialize};

/// Gate names counted as two-qubit operations.
pub const TWO_QUBIT_GATES: [&str; 9] = ["cx", "cy", "cz", "ch", "crz", "cp", "cu", "swap", "ecr"];

const MEASURE: &str = "measure";
const BARRIER: &str = "barrier";

/// Gate counts and depth of one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStats {
    /// Occurrences per operation name, broadcast operations counted per instance.
    pub ops: BTreeMap<String, u64>,
    pub total_gates: u64,
    /// Operations outside the two-qubit set and `measure`, barriers included.
    pub one_qubit_gates: u64,
    pub two_qubit_gates: u64,
    /// Longest chain of operations over qubit and classical wires, barriers excluded.
    pub depth: u64,
}

#[derive(Debug, Clone, Copy)]
enum RegisterKind {
    Quantum,
    Classical,
}

#[derive(Debug, Clone, Copy)]
struct Register {
    kind: RegisterKind,
    offset: usize,
    size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Wire {
    Qubit(usize),
    Clbit(usize),
}

/// One operation instance after register broadcast.
#[derive(Debug, Clone)]
struct Instruction {
    name: String,
    wires: Vec<Wire>,
}

#[derive(Default)]
struct Program {
    registers: BTreeMap<String, Register>,
    qubits: usize,
    clbits: usize,
    instructions: Vec<Instruction>,
}

fn circuit_error(message: &str, statement: &str) -> QorchError {
    QorchError::Circuit(
        ErrorInfo::new("qorch_exec.circuit_parse", message).with_context("statement", statement),
    )
}

fn strip_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits top-level statements on `;`, dropping `gate`/`opaque` definitions.
fn statements(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in source.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
                if depth == 0 {
                    // end of a gate body
                    current.clear();
                }
            }
            ';' if depth == 0 => {
                let statement = current.trim();
                if !statement.is_empty() {
                    out.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    out
}

fn parse_register(body: &str, statement: &str) -> Result<(String, usize), QorchError> {
    let (name, rest) = body
        .split_once('[')
        .ok_or_else(|| circuit_error("register declaration without size", statement))?;
    let size = rest
        .trim_end_matches(']')
        .trim()
        .parse::<usize>()
        .map_err(|_| circuit_error("register size is not an integer", statement))?;
    Ok((name.trim().to_string(), size))
}

impl Program {
    fn parse(source: &str) -> Result<Self, QorchError> {
        let mut program = Program::default();
        for statement in statements(&strip_comments(source)) {
            program.statement(&statement)?;
        }
        Ok(program)
    }

    fn statement(&mut self, statement: &str) -> Result<(), QorchError> {
        let mut body = statement;
        if body.starts_with("if(") || body.starts_with("if (") {
            // Classical conditions add no wires beyond the guarded operation.
            let close = body
                .find(')')
                .ok_or_else(|| circuit_error("unterminated condition", statement))?;
            body = body[close + 1..].trim();
        }
        let (head, args) = split_head(body);
        match head {
            "OPENQASM" | "include" | "gate" | "opaque" => Ok(()),
            "qreg" | "creg" => {
                let (name, size) = parse_register(args, statement)?;
                let (kind, offset) = if head == "qreg" {
                    self.qubits += size;
                    (RegisterKind::Quantum, self.qubits - size)
                } else {
                    self.clbits += size;
                    (RegisterKind::Classical, self.clbits - size)
                };
                self.registers.insert(name, Register { kind, offset, size });
                Ok(())
            }
            MEASURE => {
                let (source, target) = args
                    .split_once("->")
                    .ok_or_else(|| circuit_error("measure without target", statement))?;
                let qubits = self.operand(source.trim(), statement)?;
                let clbits = self.operand(target.trim(), statement)?;
                self.broadcast(MEASURE, vec![qubits, clbits], statement)
            }
            name => {
                let operands = args
                    .split(',')
                    .map(str::trim)
                    .filter(|arg| !arg.is_empty())
                    .map(|arg| self.operand(arg, statement))
                    .collect::<Result<Vec<_>, _>>()?;
                self.broadcast(name, operands, statement)
            }
        }
    }

    fn operand(&self, arg: &str, statement: &str) -> Result<Vec<Wire>, QorchError> {
        let (name, index) = match arg.split_once('[') {
            Some((name, rest)) => {
                let index = rest
                    .trim_end_matches(']')
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| circuit_error("operand index is not an integer", statement))?;
                (name.trim(), Some(index))
            }
            None => (arg, None),
        };
        let register = self
            .registers
            .get(name)
            .ok_or_else(|| circuit_error("operand refers to an undeclared register", statement))?;
        let wire = |i: usize| match register.kind {
            RegisterKind::Quantum => Wire::Qubit(register.offset + i),
            RegisterKind::Classical => Wire::Clbit(register.offset + i),
        };
        match index {
            Some(i) if i < register.size => Ok(vec![wire(i)]),
            Some(_) => Err(circuit_error("operand index out of range", statement)),
            None => Ok((0..register.size).map(wire).collect()),
        }
    }

    /// Whole-register operands expand to one instruction per index.
    fn broadcast(
        &mut self,
        name: &str,
        operands: Vec<Vec<Wire>>,
        statement: &str,
    ) -> Result<(), QorchError> {
        let width = operands.iter().map(Vec::len).max().unwrap_or(1);
        if name == BARRIER {
            let wires = operands.into_iter().flatten().collect();
            self.instructions.push(Instruction {
                name: name.to_string(),
                wires,
            });
            return Ok(());
        }
        for operand in &operands {
            if operand.len() != 1 && operand.len() != width {
                return Err(circuit_error("register operands differ in size", statement));
            }
        }
        for i in 0..width {
            let wires = operands
                .iter()
                .map(|operand| operand[if operand.len() == 1 { 0 } else { i }].clone())
                .collect();
            self.instructions.push(Instruction {
                name: name.to_string(),
                wires,
            });
        }
        Ok(())
    }
}

/// Splits `name(params) args` into the bare name and the argument list.
fn split_head(body: &str) -> (&str, &str) {
    let name_end = body
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(body.len());
    let name = &body[..name_end];
    let mut rest = &body[name_end..];
    if rest.trim_start().starts_with('(') {
        if let Some(close) = rest.find(')') {
            rest = &rest[close + 1..];
        }
    }
    (name, rest.trim())
}

/// Counts operations and computes depth for `source`.
pub fn analyze(source: &str) -> Result<CircuitStats, QorchError> {
    let program = Program::parse(source)?;
    let mut ops: BTreeMap<String, u64> = BTreeMap::new();
    let mut qubit_levels = vec![0u64; program.qubits];
    let mut clbit_levels = vec![0u64; program.clbits];
    for instruction in &program.instructions {
        *ops.entry(instruction.name.clone()).or_default() += 1;
        if instruction.name == BARRIER {
            continue;
        }
        let level = instruction
            .wires
            .iter()
            .map(|wire| match wire {
                Wire::Qubit(i) => qubit_levels[*i],
                Wire::Clbit(i) => clbit_levels[*i],
            })
            .max()
            .unwrap_or(0)
            + 1;
        for wire in &instruction.wires {
            match wire {
                Wire::Qubit(i) => qubit_levels[*i] = level,
                Wire::Clbit(i) => clbit_levels[*i] = level,
            }
        }
    }
    let depth = qubit_levels
        .iter()
        .chain(clbit_levels.iter())
        .copied()
        .max()
        .unwrap_or(0);
    let total_gates = ops.values().sum();
    let two_qubit_gates = ops
        .iter()
        .filter(|(name, _)| TWO_QUBIT_GATES.contains(&name.as_str()))
        .map(|(_, count)| count)
        .sum();
    let one_qubit_gates = ops
        .iter()
        .filter(|(name, _)| !TWO_QUBIT_GATES.contains(&name.as_str()) && *name != MEASURE)
        .map(|(_, count)| count)
        .sum();
    Ok(CircuitStats {
        ops,
        total_gates,
        one_qubit_gates,
        two_qubit_gates,
        depth,
    })
}

/// Maps classical bit index to measured qubit index from single-bit `measure` lines.
pub fn measure_mapping(source: &str) -> BTreeMap<u32, u32> {
    let mut mapping = BTreeMap::new();
    for line in source.lines() {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix(MEASURE) else {
            continue;
        };
        let rest = rest.trim().trim_end_matches(';');
        let Some((qubit, clbit)) = rest.split_once("->") else {
            continue;
        };
        if let (Some(q), Some(c)) = (bracket_index(qubit), bracket_index(clbit)) {
            mapping.insert(c, q);
        }
    }
    mapping
}

fn bracket_index(operand: &str) -> Option<u32> {
    let (_, rest) = operand.trim().split_once('[')?;
    rest.strip_suffix(']')?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BELL: &str = "OPENQASM 2.0;
include \"qelib1.inc\";
qreg q[2];
creg c[2];
h q[0];
cx q[0],q[1];
barrier q[0],q[1];
measure q[0] -> c[0];
measure q[1] -> c[1];
";

    #[test]
    fn bell_counts() {
        let stats = analyze(BELL).expect("analyze");
        assert_eq!(stats.total_gates, 5);
        assert_eq!(stats.one_qubit_gates, 2);
        assert_eq!(stats.two_qubit_gates, 1);
        assert_eq!(stats.depth, 3);
        assert_eq!(stats.ops["measure"], 2);
    }

    #[test]
    fn barriers_count_as_one_qubit_ops_but_not_depth() {
        let with = analyze(BELL).expect("analyze");
        let without = analyze(&BELL.replace("barrier q[0],q[1];\n", "")).expect("analyze");
        assert_eq!(with.ops["barrier"], 1);
        assert_eq!(with.one_qubit_gates, without.one_qubit_gates + 1);
        assert_eq!(with.two_qubit_gates, without.two_qubit_gates);
        assert_eq!(with.depth, without.depth);
    }

    #[test]
    fn register_broadcast_and_parameters() {
        let source = "qreg q[3];\ncreg c[3];\nrz(pi/2) q;\nmeasure q -> c;\n";
        let stats = analyze(source).expect("analyze");
        assert_eq!(stats.ops["rz"], 3);
        assert_eq!(stats.ops["measure"], 3);
        assert_eq!(stats.depth, 2);
    }

    #[test]
    fn gate_definitions_are_not_counted() {
        let source = "qreg q[2];\ngate mycx a,b { cx a,b; }\nmycx q[0],q[1];\n";
        let stats = analyze(source).expect("analyze");
        assert_eq!(stats.total_gates, 1);
        assert_eq!(stats.ops["mycx"], 1);
    }

    #[test]
    fn undeclared_register_is_an_error() {
        let err = analyze("qreg q[1];\nx r[0];\n").expect_err("bad operand");
        assert_eq!(err.info().code, "qorch_exec.circuit_parse");
    }

    #[test]
    fn mapping_from_measure_lines() {
        let source = "measure q[4] -> c[0];\nmeasure q[2] -> c[1];\nmeasure q -> c;\n";
        let mapping = measure_mapping(source);
        assert_eq!(mapping, BTreeMap::from([(0, 4), (1, 2)]));
    }
}
