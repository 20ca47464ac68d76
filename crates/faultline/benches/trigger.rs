//! Hot-path benchmarks for the trigger decision.
//!
//! Two paths matter: the steady-state trigger on an exhausted call path
//! (what production-adjacent test code pays once a budget is spent), and
//! a gated call site in a build with the gate closed (what everything
//! pays when injection is compiled out).

use criterion::{criterion_group, criterion_main, Criterion};
use faultline::{Engine, Scope};

fn trigger_steady_state(c: &mut Criterion) {
    let engine = Engine::new();
    c.bench_function("trigger_steady_state", |b| {
        // The first iteration spends the budget; every following one
        // measures the done short-circuit plus fingerprint capture.
        b.iter(|| engine.trigger().is_err());
    });
}

fn gated_site_with_gate_closed(c: &mut Criterion) {
    let scope = Scope::new();
    c.bench_function("gated_site_with_gate_closed", |b| {
        b.iter(|| faultline::trigger(&scope).is_ok());
    });
}

criterion_group!(benches, trigger_steady_state, gated_site_with_gate_closed);
criterion_main!(benches);
