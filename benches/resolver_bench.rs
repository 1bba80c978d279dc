use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use packet_compat::capability::{Candidate, Capability};
use packet_compat::protocol::attributes::AttributeProperty;
use packet_compat::runtime::builds;
use packet_compat::shim::AttributeShim;

#[allow(clippy::unwrap_used)]
fn bench_capability(c: &mut Criterion) {
    let mut group = c.benchmark_group("capability");

    let capability: Capability<(), u64> = Capability::new("bench")
        .candidate(Candidate::new("declines", |_: &()| None))
        .candidate(Candidate::new("binds", |_: &()| Some(7)));
    capability.get().unwrap();

    group.bench_function("resolved_get", |b| b.iter(|| *capability.get().unwrap()));

    group.bench_function("first_resolution", |b| {
        b.iter(|| {
            let fresh: Capability<(), u64> = Capability::new("bench")
                .candidate(Candidate::new("declines", |_: &()| None))
                .candidate(Candidate::new("binds", |_: &()| Some(7)));
            *fresh.get().unwrap()
        })
    });

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_attribute_shim(c: &mut Criterion) {
    let mut group = c.benchmark_group("attribute_shim");
    let property = AttributeProperty::new("generic.max_health", 20.0);

    for runtime in builds::all() {
        let shim = AttributeShim::new(Arc::new(runtime));
        let label = shim.runtime().build().to_string();
        let snapshot = shim.from_property(&property).unwrap();

        group.bench_function(format!("key_{label}"), |b| b.iter(|| snapshot.key().unwrap()));
        group.bench_function(format!("create_{label}"), |b| {
            b.iter(|| shim.from_property(&property).unwrap().into_native())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_capability, bench_attribute_shim);
criterion_main!(benches);
