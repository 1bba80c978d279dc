#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Concurrency tests: first use of a capability from many threads, shared
//! shims, and codec work spread over a multi-threaded runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use packet_compat::capability::{Candidate, Capability};
use packet_compat::core::version::{ServerVersion, VersionPair};
use packet_compat::protocol::attributes::{
    AttributeModifier, AttributeProperty, ModifierOperation, UpdateAttributes,
};
use packet_compat::protocol::chat::{ChatMessage, ChatPosition};
use packet_compat::protocol::packet::{decode, encode};
use packet_compat::runtime::{builds, Runtime, SharedRuntime, SimulatedRuntime};
use packet_compat::shim::AttributeShim;
use uuid::Uuid;

const THREADS: usize = 16;

#[test]
fn concurrent_first_use_binds_once() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let capability: Capability<(), String> = Capability::new("slow_probe")
        .candidate(Candidate::new("declines", |_: &()| None))
        .candidate(Candidate::new("binds", move |_: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the window in which other threads arrive mid-probe
            thread::sleep(Duration::from_millis(20));
            Some(String::from("strategy"))
        }));

    let barrier = Barrier::new(THREADS);
    let addresses: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let barrier = &barrier;
                let capability = &capability;
                scope.spawn(move || {
                    barrier.wait();
                    let strategy = capability.get().unwrap();
                    strategy as *const String as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(probes.load(Ordering::SeqCst), 1);
    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(capability.bound_candidate(), Some("binds"));
}

#[test]
fn concurrent_unsupported_is_reported_to_every_caller() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let capability: Capability<(), u8> =
        Capability::new("missing").candidate(Candidate::new("never", move |_: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        }));

    let barrier = Barrier::new(THREADS);
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                barrier.wait();
                assert!(capability.get().is_err());
            });
        }
    });

    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

fn exercise(shim: &AttributeShim, i: usize) -> AttributeProperty {
    let modifier = AttributeModifier {
        uuid: Uuid::from_u128(i as u128),
        amount: i as f64,
        operation: ModifierOperation::Add,
    };
    let snapshot = shim
        .create("generic.movement_speed", 0.1, &[modifier])
        .expect("create");
    snapshot.to_property().expect("read back")
}

fn shared(runtime: &Arc<SimulatedRuntime>) -> SharedRuntime {
    Arc::clone(runtime) as SharedRuntime
}

#[test]
fn concurrent_shim_use_probes_once() {
    for build in [builds::outer_instance, builds::string_key, builds::registry] {
        // Lookups a single caller needs to resolve everything it touches
        let baseline = Arc::new(build());
        exercise(&AttributeShim::new(shared(&baseline)), 0);
        let expected_lookups = baseline.lookup_count();

        let runtime = Arc::new(build());
        let shim = AttributeShim::new(shared(&runtime));
        let barrier = Barrier::new(THREADS);
        let properties: Vec<AttributeProperty> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let shim = &shim;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        exercise(shim, i)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(runtime.lookup_count(), expected_lookups, "build {}", runtime.build());
        for (i, property) in properties.iter().enumerate() {
            assert_eq!(property.key, "generic.movement_speed");
            assert_eq!(property.modifiers[0].amount, i as f64);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 2_000usize;
    let mut tasks = JoinSet::new();
    for server in [
        ServerVersion::V1_7_10,
        ServerVersion::V1_8_8,
        ServerVersion::V1_12_2,
        ServerVersion::V1_13,
        ServerVersion::V1_16_5,
        ServerVersion::V1_17,
    ] {
        tasks.spawn(async move {
            let versions = VersionPair::native(server);
            for i in 0..iterations {
                let chat = ChatMessage::new(format!(r#"{{"text":"msg {i}"}}"#), ChatPosition::Chat);
                let bytes = encode(&chat, versions).unwrap();
                let decoded = decode::<ChatMessage>(&bytes, versions).unwrap();
                assert!(decoded.is_complete());
                assert_eq!(decoded.into_packet().message, chat.message);

                let update = UpdateAttributes {
                    entity_id: i as i32,
                    properties: vec![AttributeProperty::new("generic.armor", i as f64)],
                };
                let bytes = encode(&update, versions).unwrap();
                let decoded = decode::<UpdateAttributes>(&bytes, versions).unwrap();
                assert_eq!(decoded.into_packet(), update);
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}
