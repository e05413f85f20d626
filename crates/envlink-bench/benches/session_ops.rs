//! Criterion micro-benchmarks for spec registries and session round trips.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use envlink_bench::{agent_actions, agent_specs};
use envlink_core::{Request, Response, Settings, Tensor};
use envlink_server::Server;
use envlink_spec::SessionSpecs;
use envlink_test_utils::{tensors, uids, CounterFactory};

/// Benchmark: Assign uids to 64 action specs.
fn bench_build_registry(c: &mut Criterion) {
    let specs = agent_specs(64);

    c.bench_function("spec_build_64", |b| {
        b.iter(|| {
            let built = SessionSpecs::build(black_box(specs.clone()), Vec::new()).unwrap();
            black_box(built);
        });
    });
}

/// Benchmark: Resolve and decode 64 uid-keyed actions.
fn bench_unpack_actions(c: &mut Criterion) {
    let specs = SessionSpecs::build(agent_specs(64), Vec::new()).unwrap();
    let actions = agent_actions(&specs);

    c.bench_function("spec_unpack_64", |b| {
        b.iter(|| {
            let unpacked = specs.actions.unpack(black_box(&actions)).unwrap();
            black_box(unpacked);
        });
    });
}

/// Benchmark: One running Step through a connection and world actor.
fn bench_step_round_trip(c: &mut Criterion) {
    let (factory, _events) = CounterFactory::new();
    let server = Server::new(factory).unwrap();
    let mut conn = server.connect();
    let Response::CreateWorld { world_name } = conn.handle(Request::CreateWorld {
        settings: Settings::new(),
    }) else {
        panic!("create failed");
    };
    conn.handle(Request::JoinWorld {
        world_name,
        settings: Settings::new(),
    });
    let step = Request::Step {
        actions: tensors([(1, Tensor::scalar(0i32))]),
        requested_observations: uids(&[1, 2]),
    };
    conn.handle(step.clone());

    c.bench_function("session_step_round_trip", |b| {
        b.iter(|| {
            let response = conn.handle(black_box(step.clone()));
            black_box(response);
        });
    });
}

criterion_group!(
    benches,
    bench_build_registry,
    bench_unpack_actions,
    bench_step_round_trip
);
criterion_main!(benches);
