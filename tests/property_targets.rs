//! Property-based tests for target source strategies
//!
//! These verify identity and bound invariants for arbitrary call counts and
//! pool sizes rather than a handful of fixed cases.

use ferrous_targets::{
    ComponentRegistry, PoolConfig, PoolingTargetSource, PrototypeTargetSource,
    LazyCreationTargetSource, SingletonTargetSource, TargetSource, TargetSpec,
    ThreadLocalTargetSource,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Item {
    value: u64,
}

fn registry(value: u64) -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.add_prototype_factory("item", move |_| Item { value });
    Arc::new(registry)
}

// Property: a singleton source returns the very same instance on every call
proptest! {
    #[test]
    fn singleton_identity_holds_for_any_call_count(value in any::<u64>(), calls in 1usize..50) {
        let source = SingletonTargetSource::from_value(Item { value });
        let first = source.get_target().unwrap().unwrap();

        for _ in 0..calls {
            let target = source.get_target().unwrap().unwrap();
            prop_assert!(Arc::ptr_eq(&first, &target));
            prop_assert_eq!(target.value, value);
        }
    }
}

// Property: per-call sources never hand out the same instance twice
proptest! {
    #[test]
    fn prototype_instances_are_pairwise_distinct(value in any::<u64>(), calls in 2usize..30) {
        let source = PrototypeTargetSource::<Item>::attach(TargetSpec::named("item"), registry(value)).unwrap();
        let targets: Vec<_> = (0..calls).map(|_| source.get_target().unwrap().unwrap()).collect();

        for (i, a) in targets.iter().enumerate() {
            prop_assert_eq!(a.value, value);
            for b in &targets[i + 1..] {
                prop_assert!(!Arc::ptr_eq(a, b));
            }
        }
    }
}

// Property: hits + distinct instances == invocations, on one thread
proptest! {
    #[test]
    fn thread_local_counters_add_up(calls in 1u64..100) {
        let source = ThreadLocalTargetSource::<Item>::attach(TargetSpec::named("item"), registry(1)).unwrap();
        for _ in 0..calls {
            source.get_target().unwrap();
        }

        let stats = source.stats();
        prop_assert_eq!(stats.invocation_count, calls);
        prop_assert_eq!(stats.object_count, 1);
        prop_assert_eq!(stats.hit_count + stats.object_count as u64, stats.invocation_count);
    }
}

// Property: a fail-fast pool lends out exactly max_size instances, then refuses
proptest! {
    #[test]
    fn pool_never_exceeds_max_size(max_size in 1usize..16, extra in 1usize..8) {
        let pool = PoolingTargetSource::<Item>::attach(
            TargetSpec::named("item"),
            PoolConfig::with_max_size(max_size).fail_fast(),
            registry(3),
        )
        .unwrap();

        let mut held = Vec::new();
        for _ in 0..max_size {
            held.push(pool.get_target().unwrap().unwrap());
        }
        for _ in 0..extra {
            prop_assert!(pool.get_target().is_err());
        }
        prop_assert_eq!(pool.active_count(), max_size);

        for item in held {
            pool.release_target(item).unwrap();
        }
        prop_assert_eq!(pool.active_count(), 0);
        prop_assert_eq!(pool.idle_count(), max_size);
    }
}

// Property: lazy creation runs the hook once regardless of how often it is read
proptest! {
    #[test]
    fn lazy_creation_runs_once(calls in 1usize..50) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let source = LazyCreationTargetSource::new("item", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Item { value: 5 }))
        });

        for _ in 0..calls {
            prop_assert_eq!(source.get_target().unwrap().unwrap().value, 5);
        }
        prop_assert_eq!(created.load(Ordering::SeqCst), 1);
    }
}
