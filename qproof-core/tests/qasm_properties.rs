//! Property tests for validation and OpenQASM rendering

use proptest::prelude::*;
use qproof_core::{qasm::to_qasm, Circuit, CircuitBuilder};

#[derive(Clone, Debug)]
enum Op {
    H(usize),
    X(usize),
    Cx(usize, usize),
    Rz(usize, f64),
    Delay(usize, f64),
    Measure(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6usize).prop_map(Op::H),
        (0..6usize).prop_map(Op::X),
        (0..6usize, 0..6usize).prop_map(|(a, b)| Op::Cx(a, b)),
        (0..6usize, -10.0..10.0f64).prop_map(|(q, a)| Op::Rz(q, a)),
        (0..6usize, -5.0..100.0f64).prop_map(|(q, d)| Op::Delay(q, d)),
        (0..6usize, 0..6usize).prop_map(|(q, c)| Op::Measure(q, c)),
    ]
}

fn apply(builder: &mut CircuitBuilder, op: &Op) {
    match *op {
        Op::H(q) => builder.h(q),
        Op::X(q) => builder.x(q),
        Op::Cx(a, b) => builder.cx(a, b),
        Op::Rz(q, a) => builder.rz(q, a),
        Op::Delay(q, d) => builder.delay(q, d),
        Op::Measure(q, c) => builder.measure(q, c),
    };
}

fn op_is_valid(op: &Op, nq: usize, nc: usize) -> bool {
    match *op {
        Op::H(q) | Op::X(q) | Op::Rz(q, _) => q < nq,
        Op::Cx(a, b) => a < nq && b < nq && a != b,
        Op::Delay(q, d) => q < nq && d >= 0.0,
        Op::Measure(q, c) => q < nq && c < nc,
    }
}

proptest! {
    #[test]
    fn build_succeeds_iff_every_gate_is_valid(
        nq in 1..5usize,
        nc in 0..5usize,
        ops in prop::collection::vec(op_strategy(), 0..20),
    ) {
        let mut builder = Circuit::builder("p", nq, nc);
        for op in &ops {
            apply(&mut builder, op);
        }
        let expected_ok = ops.iter().all(|op| op_is_valid(op, nq, nc));
        prop_assert_eq!(builder.build().is_ok(), expected_ok);
    }

    #[test]
    fn rendering_is_deterministic_and_name_independent(
        ops in prop::collection::vec(op_strategy(), 0..20),
    ) {
        let valid: Vec<Op> = ops.into_iter().filter(|op| op_is_valid(op, 6, 6)).collect();
        let mut a = Circuit::builder("first", 6, 6);
        let mut b = Circuit::builder("second", 6, 6);
        for op in &valid {
            apply(&mut a, op);
            apply(&mut b, op);
        }
        b.family("bell").request_id("other");
        let a = a.build().unwrap();
        let b = b.build().unwrap();
        prop_assert_eq!(to_qasm(&a), to_qasm(&a));
        prop_assert_eq!(to_qasm(&a), to_qasm(&b));
    }
}
