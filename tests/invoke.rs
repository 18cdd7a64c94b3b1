use ferrous_targets::target::invoke;
use ferrous_targets::{
    ComponentRegistry, DiError, EmptyTargetSource, PoolConfig, PoolingTargetSource,
    PrototypeTargetSource, TargetSource, TargetSpec,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

struct Worker {
    name: &'static str,
}

fn worker_pool(max_size: usize) -> PoolingTargetSource<Worker> {
    let mut registry = ComponentRegistry::new();
    registry.add_prototype_factory("worker", |_| Worker { name: "w" });
    PoolingTargetSource::attach(
        TargetSpec::named("worker"),
        PoolConfig::with_max_size(max_size).fail_fast(),
        Arc::new(registry),
    )
    .unwrap()
}

#[test]
fn test_invoke_releases_after_call() {
    let pool = worker_pool(1);

    for _ in 0..5 {
        let name = invoke(&pool, |worker| worker.unwrap().name).unwrap();
        assert_eq!(name, "w");
        assert_eq!(pool.active_count(), 0);
    }
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_invoke_releases_when_call_panics() {
    let pool = worker_pool(1);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        invoke(&pool, |_worker| -> () { panic!("call failed") })
    }));
    assert!(outcome.is_err());

    // The pool of one is usable again, so the worker went back
    assert_eq!(pool.active_count(), 0);
    assert!(invoke(&pool, |worker| worker.is_some()).unwrap());
}

#[test]
fn test_invoke_propagates_resolution_errors() {
    let pool = worker_pool(1);
    let held = pool.get_target().unwrap().unwrap();

    let result = invoke(&pool, |_| unreachable!("no target should be resolved"));
    assert_eq!(result.unwrap_err(), DiError::PoolExhausted { max_size: 1 });

    pool.release_target(held).unwrap();
}

#[test]
fn test_invoke_with_empty_source() {
    let empty = EmptyTargetSource::instance();
    let saw_target = invoke(&*empty, |target| target.is_some()).unwrap();
    assert!(!saw_target);
}

#[test]
fn test_invoke_through_trait_object() {
    let mut registry = ComponentRegistry::new();
    registry.add_prototype_factory("worker", |_| Worker { name: "dyn" });
    let source: Box<dyn TargetSource<Target = Worker>> = Box::new(
        PrototypeTargetSource::<Worker>::attach(TargetSpec::named("worker"), Arc::new(registry)).unwrap(),
    );

    assert_eq!(invoke(source.as_ref(), |w| w.unwrap().name).unwrap(), "dyn");
}
