use ferrous_targets::{
    BoxError, ComponentRegistry, DiError, DiResult, LifecycleState, PoolConfig, PoolEngine,
    PoolEngineBuilder, PooledObjectFactory, PoolingTargetSource, TargetSource, TargetSpec,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Connection {
    id: usize,
}

struct Fixture {
    registry: Arc<ComponentRegistry>,
    created: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let mut registry = ComponentRegistry::new();
        registry.add_prototype_factory("connection", move |_| Connection {
            id: counter.fetch_add(1, Ordering::SeqCst),
        });

        Self {
            registry: Arc::new(registry),
            created,
            destroyed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn spec(&self) -> TargetSpec<Connection> {
        let destroyed = self.destroyed.clone();
        TargetSpec::named("connection").with_destroy_hook(move |_: &Connection| -> Result<(), BoxError> {
            destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn pool(&self, config: PoolConfig) -> PoolingTargetSource<Connection> {
        PoolingTargetSource::attach(self.spec(), config, self.registry.clone()).unwrap()
    }
}

#[test]
fn test_released_targets_are_reused() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(4));

    let a = pool.get_target().unwrap().unwrap();
    assert_eq!(pool.active_count(), 1);
    pool.release_target(a.clone()).unwrap();
    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.idle_count(), 1);

    let b = pool.get_target().unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(fixture.created.load(Ordering::SeqCst), 1);
    assert_eq!(pool.max_size(), 4);
    assert!(!pool.is_static());
}

#[test]
fn test_fail_fast_pool_never_exceeds_max_size() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(3).fail_fast());

    let held: Vec<_> = (0..3).map(|_| pool.get_target().unwrap().unwrap()).collect();
    assert_eq!(
        pool.get_target().unwrap_err(),
        DiError::PoolExhausted { max_size: 3 }
    );
    assert_eq!(pool.active_count(), 3);

    for connection in held {
        pool.release_target(connection).unwrap();
    }
    // Every returned instance is borrowable again
    let again: Vec<_> = (0..3).map(|_| pool.get_target().unwrap().unwrap()).collect();
    assert_eq!(again.len(), 3);
    assert_eq!(fixture.created.load(Ordering::SeqCst), 3);
}

#[test]
fn test_blocking_pool_times_out() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(1).with_max_wait(Duration::from_millis(50)));

    let _held = pool.get_target().unwrap().unwrap();
    let started = Instant::now();
    assert!(matches!(pool.get_target(), Err(DiError::PoolExhausted { max_size: 1 })));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_blocked_borrower_wakes_on_release() {
    let fixture = Fixture::new();
    let pool = Arc::new(fixture.pool(PoolConfig::with_max_size(1)));

    let held = pool.get_target().unwrap().unwrap();
    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.get_target().unwrap().unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    pool.release_target(held.clone()).unwrap();

    let received = waiter.join().unwrap();
    assert!(Arc::ptr_eq(&held, &received));
}

#[test]
fn test_concurrent_borrowers_respect_bound() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(2));
    let in_use = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| {
                for _ in 0..25 {
                    let connection = pool.get_target().unwrap().unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::yield_now();
                    in_use.fetch_sub(1, Ordering::SeqCst);
                    pool.release_target(connection).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(fixture.created.load(Ordering::SeqCst) <= 2);
    assert_eq!(pool.active_count(), 0);
}

#[test]
fn test_releasing_foreign_instance_fails() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(1));

    let stranger = Arc::new(Connection { id: 42 });
    assert_eq!(pool.release_target(stranger).unwrap_err(), DiError::ForeignInstance);
}

#[test]
fn test_dispose_destroys_idle_instances() {
    let fixture = Fixture::new();
    let pool = fixture.pool(PoolConfig::with_max_size(3));

    let a = pool.get_target().unwrap().unwrap();
    let b = pool.get_target().unwrap().unwrap();
    let c = pool.get_target().unwrap().unwrap();
    pool.release_target(a).unwrap();
    pool.release_target(b).unwrap();

    pool.dispose();
    assert_eq!(fixture.destroyed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.state(), LifecycleState::Disposed);
    assert_eq!(pool.get_target().unwrap_err(), DiError::Disposed("PoolingTargetSource"));

    // Outstanding instances are destroyed once released
    pool.release_target(c).unwrap();
    assert_eq!(fixture.destroyed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_invalid_config_is_rejected_at_attach() {
    let fixture = Fixture::new();
    let result = PoolingTargetSource::attach(fixture.spec(), PoolConfig::with_max_size(0), fixture.registry.clone());
    assert!(matches!(result, Err(DiError::InvalidConfig(_))));
}

#[test]
fn test_singleton_component_is_rejected() {
    let mut registry = ComponentRegistry::new();
    registry.add_singleton("connection", Connection { id: 0 });

    let result = PoolingTargetSource::<Connection>::attach(
        TargetSpec::named("connection"),
        PoolConfig::default(),
        Arc::new(registry),
    );
    assert!(matches!(result, Err(DiError::SingletonScope(_))));
}

// ===== Fake engine =====

/// Engine that never pools: creates on borrow, destroys on return, and
/// records every call.
struct RecordingEngine {
    objects: Arc<dyn PooledObjectFactory<Connection>>,
    calls: Arc<Mutex<Vec<String>>>,
    active: AtomicUsize,
}

impl PoolEngine<Connection> for RecordingEngine {
    fn borrow_object(&self) -> DiResult<Arc<Connection>> {
        self.calls.lock().push("borrow".to_string());
        self.active.fetch_add(1, Ordering::SeqCst);
        self.objects.create()
    }

    fn return_object(&self, instance: Arc<Connection>) -> DiResult<()> {
        self.calls.lock().push(format!("return {}", instance.id));
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.objects.destroy(instance);
        Ok(())
    }

    fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn idle_count(&self) -> usize {
        0
    }

    fn close(&self) {
        self.calls.lock().push("close".to_string());
    }
}

struct RecordingEngineBuilder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl PoolEngineBuilder<Connection> for RecordingEngineBuilder {
    fn build_pool(
        &self,
        config: &PoolConfig,
        objects: Arc<dyn PooledObjectFactory<Connection>>,
    ) -> DiResult<Box<dyn PoolEngine<Connection>>> {
        self.calls.lock().push(format!("build max_size={}", config.max_size));
        Ok(Box::new(RecordingEngine {
            objects,
            calls: self.calls.clone(),
            active: AtomicUsize::new(0),
        }))
    }
}

#[test]
fn test_pool_engine_is_pluggable() {
    let fixture = Fixture::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let builder = RecordingEngineBuilder { calls: calls.clone() };

    let pool = PoolingTargetSource::attach_with_engine(
        fixture.spec(),
        PoolConfig::with_max_size(5),
        fixture.registry.clone(),
        &builder,
    )
    .unwrap();

    let connection = pool.get_target().unwrap().unwrap();
    assert_eq!(pool.active_count(), 1);
    pool.release_target(connection).unwrap();
    pool.dispose();

    assert_eq!(
        *calls.lock(),
        vec!["build max_size=5", "borrow", "return 0", "close"]
    );
    // The engine's destroy call reached the destroy hook
    assert_eq!(fixture.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_engine_build_failure_fails_attach() {
    struct Refusing;

    impl PoolEngineBuilder<Connection> for Refusing {
        fn build_pool(
            &self,
            _config: &PoolConfig,
            _objects: Arc<dyn PooledObjectFactory<Connection>>,
        ) -> DiResult<Box<dyn PoolEngine<Connection>>> {
            Err(DiError::InvalidConfig("no engine available".to_string()))
        }
    }

    let fixture = Fixture::new();
    let result = PoolingTargetSource::attach_with_engine(
        fixture.spec(),
        PoolConfig::default(),
        fixture.registry.clone(),
        &Refusing,
    );
    assert!(matches!(result, Err(DiError::InvalidConfig(_))));
}

#[test]
fn test_panicking_constructor_does_not_shrink_the_pool() {
    let first_call = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let flag = first_call.clone();
    let mut registry = ComponentRegistry::new();
    registry.add_prototype_factory("connection", move |_| {
        if flag.swap(false, Ordering::SeqCst) {
            panic!("connection refused");
        }
        Connection { id: 1 }
    });
    let pool = PoolingTargetSource::<Connection>::attach(
        TargetSpec::named("connection"),
        PoolConfig::with_max_size(1).with_max_wait(Duration::from_millis(200)),
        Arc::new(registry),
    )
    .unwrap();

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.get_target()));
    assert!(unwound.is_err());

    let id = ferrous_targets::target::invoke(&pool, |c| c.map(|c| c.id)).unwrap();
    assert_eq!(id, Some(1));
    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.idle_count(), 1);
}
