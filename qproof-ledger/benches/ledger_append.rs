//! Ledger append and seal throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qproof_ledger::{ExecutionMode, Ledger, PolicyTrace};
use serde_json::json;

fn trace() -> PolicyTrace {
    PolicyTrace {
        selected_backend: Some("ibm_kyiv".to_string()),
        reason_codes: vec!["LEAST_LOADED".to_string()],
        policy_version: "qproof-policy/1".to_string(),
    }
}

fn bench_create_entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entry");
    for mode in [ExecutionMode::Qpu, ExecutionMode::Dev] {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            let ledger = Ledger::new();
            let result = match mode {
                ExecutionMode::Dev => Some(json!({"00": 498, "11": 502, "01": 12, "10": 9})),
                ExecutionMode::Qpu => None,
            };
            b.iter(|| {
                ledger
                    .create_entry(
                        black_box(&json!({"family": "bell", "shots": 1024})),
                        mode,
                        trace(),
                        result.clone(),
                    )
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_seal_relink(c: &mut Criterion) {
    let mut group = c.benchmark_group("seal_relink");
    for tail in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(tail), &tail, |b, &tail| {
            b.iter_batched(
                || {
                    let ledger = Ledger::new();
                    let first = ledger
                        .create_entry(&json!({"i": 0}), ExecutionMode::Qpu, trace(), None)
                        .unwrap();
                    for i in 0..tail {
                        ledger
                            .create_entry(&json!({"i": i + 1}), ExecutionMode::Qpu, trace(), None)
                            .unwrap();
                    }
                    (ledger, first.id)
                },
                |(ledger, id)| ledger.seal_entry(&id, &json!({"00": 1})).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create_entry, bench_seal_relink);
criterion_main!(benches);
