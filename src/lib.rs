//! # ferrous-targets
//!
//! Pluggable target sources for interception proxies.
//!
//! A proxy does not hold the object it forwards calls to. Before each call it
//! asks a [`TargetSource`] for the *target*, dispatches to it and hands it
//! back. The strategy behind the source decides what callers see:
//!
//! - **Fixed**: [`SingletonTargetSource`] always returns the same instance;
//!   [`EmptyTargetSource`] returns none at all
//! - **Swappable**: [`HotSwappableTargetSource`] replaces its target atomically at runtime
//! - **Per call**: [`PrototypeTargetSource`] creates a fresh instance every time
//! - **Per thread**: [`ThreadLocalTargetSource`] binds one instance to each thread
//! - **Pooled**: [`PoolingTargetSource`] lends instances out of a bounded pool
//! - **Deferred**: [`LazyInitTargetSource`] and [`LazyCreationTargetSource`]
//!   create their single instance on first use
//! - **Refreshing**: [`RefreshableTargetSource`] swaps in a fresh instance periodically
//!
//! Factory-backed strategies obtain instances by name from a
//! [`ComponentFactory`]; [`ComponentRegistry`] is an in-memory one.
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_targets::{ComponentRegistry, PrototypeTargetSource, TargetSource, TargetSpec};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Repository {
//!     db: Arc<Database>,
//! }
//!
//! let mut registry = ComponentRegistry::new();
//! registry.add_singleton("db", Database { url: "postgres://localhost".to_string() });
//! registry.add_prototype_factory("repository", |r| Repository {
//!     db: r.get::<Database>("db").unwrap(),
//! });
//!
//! let source = PrototypeTargetSource::<Repository>::attach(
//!     TargetSpec::named("repository"),
//!     Arc::new(registry),
//! )
//! .unwrap();
//!
//! let first = source.get_target().unwrap().unwrap();
//! let second = source.get_target().unwrap().unwrap();
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert_eq!(first.db.url, "postgres://localhost");
//! ```
//!
//! ## Releasing targets
//!
//! Every `get_target` must be paired with a `release_target`, even when the
//! call fails. [`target::invoke`] does the pairing:
//!
//! ```rust
//! use ferrous_targets::target::invoke;
//! use ferrous_targets::HotSwappableTargetSource;
//! use std::sync::Arc;
//!
//! let source = HotSwappableTargetSource::new(Arc::new(1u32));
//! assert_eq!(invoke(&source, |n| *n.unwrap() + 1).unwrap(), 2);
//!
//! source.swap(Arc::new(41u32)).unwrap();
//! assert_eq!(invoke(&source, |n| *n.unwrap() + 1).unwrap(), 42);
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (instance creation, pool activity,
//! disposal, swallowed destroy failures) and installs no subscriber.

pub mod config;
pub mod descriptors;
pub mod error;
pub mod factory;
pub mod lifetime;
pub mod pool;
pub mod target;
pub mod traits;

mod internal;
mod registration;

pub use config::{
    ConfigProvider, ConfigSource, ConfigValue, EnvironmentConfigSource, MemoryConfigSource,
    PoolConfig, RefreshConfig,
};
pub use descriptors::{ComponentDescriptor, TypeDescriptor};
pub use error::{BoxError, DiError, DiResult};
pub use factory::{ComponentFactory, ComponentRegistry};
pub use internal::LifecycleState;
pub use lifetime::Lifetime;
pub use pool::{
    BoundedPool, BoundedPoolBuilder, PoolEngine, PoolEngineBuilder, PoolStats, PooledObjectFactory,
};
pub use registration::AnyArc;
pub use target::{
    EmptyTargetSource, FactoryBacked, HotSwappableTargetSource, LazyCreationTargetSource,
    LazyInitTargetSource, PoolingTargetSource, PrototypeTargetSource, RefreshableTargetSource,
    SimpleTargetSource, SingletonTargetSource, TargetSpec, ThreadLocalStats,
    ThreadLocalTargetSource,
};
pub use traits::{Dispose, TargetSource};
