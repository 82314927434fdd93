//! OpenQASM 3 export
//!
//! The rendering is a pure function of the circuit's structure: qubit count,
//! classical-bit count and gate sequence. Name and metadata are left out so two
//! structurally identical circuits produce byte-identical text.

use crate::{Circuit, Gate};
use std::fmt::Write;

/// OpenQASM version header emitted on the first line
pub const QASM_HEADER: &str = "OPENQASM 3.0;";

/// Render a circuit as OpenQASM 3
///
/// Angles and durations use Rust's shortest round-trip float formatting, so the
/// same `f64` always renders to the same text.
///
/// # Example
/// ```
/// use qproof_core::{Circuit, qasm::to_qasm};
///
/// let mut builder = Circuit::builder("bell", 2, 2);
/// builder.h(0).cx(0, 1).measure_all();
/// let text = to_qasm(&builder.build().unwrap());
///
/// assert!(text.starts_with("OPENQASM 3.0;"));
/// assert!(text.contains("cx q[0], q[1];"));
/// assert!(text.contains("c[1] = measure q[1];"));
/// ```
pub fn to_qasm(circuit: &Circuit) -> String {
    let mut out = String::with_capacity(64 + circuit.len() * 16);
    out.push_str(QASM_HEADER);
    out.push('\n');
    out.push_str("include \"stdgates.inc\";\n");
    // writing into a String cannot fail
    let _ = writeln!(out, "qubit[{}] q;", circuit.num_qubits());
    if circuit.num_clbits() > 0 {
        let _ = writeln!(out, "bit[{}] c;", circuit.num_clbits());
    }
    for gate in circuit.gates() {
        render_gate(&mut out, gate);
    }
    out
}

fn render_gate(out: &mut String, gate: &Gate) {
    let _ = match gate {
        Gate::Single { kind, target } => {
            writeln!(out, "{} q[{}];", kind.mnemonic(), target.index())
        }
        Gate::Two {
            kind,
            control,
            target,
        } => writeln!(
            out,
            "{} q[{}], q[{}];",
            kind.mnemonic(),
            control.index(),
            target.index()
        ),
        Gate::Rotation {
            kind,
            target,
            angle,
        } => writeln!(out, "{}({:?}) q[{}];", kind.mnemonic(), angle, target.index()),
        Gate::Barrier { qubits } => {
            let operands: Vec<String> = qubits.iter().map(|q| format!("q[{}]", q.index())).collect();
            writeln!(out, "barrier {};", operands.join(", "))
        }
        Gate::Delay { qubit, duration_us } => {
            writeln!(out, "delay[{:?}us] q[{}];", duration_us, qubit.index())
        }
        Gate::Measure { qubit, clbit } => {
            writeln!(out, "c[{}] = measure q[{}];", clbit.index(), qubit.index())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_rendering() {
        let mut builder = Circuit::builder("all", 2, 1);
        builder
            .id(0)
            .sx(1)
            .rz(0, 0.25)
            .phase(1, 1.0)
            .barrier([0, 1])
            .delay(1, 40.0)
            .swap(0, 1)
            .measure(1, 0);
        let circuit = builder.build().unwrap();

        let expected = "OPENQASM 3.0;\n\
            include \"stdgates.inc\";\n\
            qubit[2] q;\n\
            bit[1] c;\n\
            id q[0];\n\
            sx q[1];\n\
            rz(0.25) q[0];\n\
            p(1.0) q[1];\n\
            barrier q[0], q[1];\n\
            delay[40.0us] q[1];\n\
            swap q[0], q[1];\n\
            c[0] = measure q[1];\n";
        assert_eq!(to_qasm(&circuit), expected);
    }

    #[test]
    fn test_name_and_metadata_do_not_affect_output() {
        let mut a = Circuit::builder("first", 2, 2);
        a.h(0).cx(0, 1).measure_all().family("bell").request_id("r1");
        let mut b = Circuit::builder("second", 2, 2);
        b.h(0).cx(0, 1).measure_all();

        assert_eq!(to_qasm(&a.build().unwrap()), to_qasm(&b.build().unwrap()));
    }

    #[test]
    fn test_no_bit_register_without_clbits() {
        let mut builder = Circuit::builder("nomeas", 1, 0);
        builder.h(0);
        let text = builder.build().unwrap().to_qasm();
        assert!(!text.contains("bit["));
    }
}
