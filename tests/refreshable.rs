use ferrous_targets::{
    ComponentRegistry, DiError, RefreshConfig, RefreshableTargetSource, TargetSource, TargetSpec,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

#[derive(Debug)]
struct Rates {
    version: u32,
}

fn versioned_source(config: RefreshConfig) -> (RefreshableTargetSource<Rates>, Arc<AtomicU32>) {
    let version = Arc::new(AtomicU32::new(1));
    let current = version.clone();
    let source = RefreshableTargetSource::new("rates", config, move || {
        Ok(Arc::new(Rates {
            version: current.load(Ordering::SeqCst),
        }))
    });
    (source, version)
}

#[test]
fn test_first_call_fetches() {
    let (source, _) = versioned_source(RefreshConfig::default());
    assert_eq!(source.refresh_count(), 0);
    assert!(source.last_refresh().is_none());

    let before = SystemTime::now();
    assert_eq!(source.get_target().unwrap().unwrap().version, 1);
    assert_eq!(source.refresh_count(), 1);
    assert!(source.last_refresh().unwrap() >= before);
}

#[test]
fn test_without_delay_target_is_kept() {
    let (source, version) = versioned_source(RefreshConfig::default());
    let first = source.get_target().unwrap().unwrap();

    version.store(2, Ordering::SeqCst);
    let again = source.get_target().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(source.refresh_count(), 1);
}

#[test]
fn test_explicit_refresh_replaces_target() {
    let (source, version) = versioned_source(RefreshConfig::default());
    let old = source.get_target().unwrap().unwrap();

    version.store(2, Ordering::SeqCst);
    let fresh = source.refresh().unwrap();
    assert_eq!(fresh.version, 2);
    assert!(Arc::ptr_eq(&fresh, &source.get_target().unwrap().unwrap()));

    // Targets already handed out stay usable
    assert_eq!(old.version, 1);
    assert_eq!(source.refresh_count(), 2);
}

#[test]
fn test_refreshes_after_check_delay() {
    let (source, version) = versioned_source(RefreshConfig::every(Duration::from_millis(30)));
    assert_eq!(source.get_target().unwrap().unwrap().version, 1);

    version.store(2, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(source.get_target().unwrap().unwrap().version, 2);
    assert_eq!(source.refresh_count(), 2);
}

#[test]
fn test_requires_refresh_predicate_can_veto() {
    let stale = Arc::new(AtomicBool::new(false));
    let flag = stale.clone();
    let (source, version) = versioned_source(RefreshConfig::every(Duration::ZERO));
    let source = source.with_requires_refresh(move |_: &Rates| flag.load(Ordering::SeqCst));

    let first = source.get_target().unwrap().unwrap();
    version.store(2, Ordering::SeqCst);
    assert!(Arc::ptr_eq(&first, &source.get_target().unwrap().unwrap()));

    stale.store(true, Ordering::SeqCst);
    assert_eq!(source.get_target().unwrap().unwrap().version, 2);
    assert_eq!(source.refresh_count(), 2);
}

#[test]
fn test_failed_refresh_keeps_previous_target() {
    let fail = Arc::new(AtomicBool::new(false));
    let should_fail = fail.clone();
    let source = RefreshableTargetSource::new("rates", RefreshConfig::default(), move || {
        if should_fail.load(Ordering::SeqCst) {
            Err(DiError::CreationFailed {
                name: "rates".to_string(),
                message: "upstream unavailable".to_string(),
            })
        } else {
            Ok(Arc::new(Rates { version: 1 }))
        }
    });

    let first = source.get_target().unwrap().unwrap();
    fail.store(true, Ordering::SeqCst);
    assert!(source.refresh().is_err());
    assert!(Arc::ptr_eq(&first, &source.get_target().unwrap().unwrap()));
    assert_eq!(source.refresh_count(), 1);
}

#[test]
fn test_refresh_from_factory_component() {
    let version = Arc::new(AtomicU32::new(1));
    let current = version.clone();
    let mut registry = ComponentRegistry::new();
    registry.add_prototype_factory("rates", move |_| Rates {
        version: current.load(Ordering::SeqCst),
    });

    let source = RefreshableTargetSource::<Rates>::from_factory(
        TargetSpec::named("rates"),
        RefreshConfig::default(),
        Arc::new(registry),
    )
    .unwrap();

    assert_eq!(source.get_target().unwrap().unwrap().version, 1);
    version.store(7, Ordering::SeqCst);
    assert_eq!(source.refresh().unwrap().version, 7);
    assert!(source.target_type().unwrap().is::<Rates>());
}
