//! Pooling target source: targets borrowed from a bounded object pool.

use std::fmt;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::factory::ComponentFactory;
use crate::internal::LifecycleState;
use crate::pool::{BoundedPoolBuilder, PoolEngine, PoolEngineBuilder, PooledObjectFactory};
use crate::target::factory_backed::TargetSpec;
use crate::target::prototype::PrototypeTargetSource;
use crate::traits::TargetSource;

const KIND: &str = "PoolingTargetSource";

/// Pool lifecycle hooks backed by a prototype-scoped component.
struct PrototypeObjects<T> {
    prototype: Arc<PrototypeTargetSource<T>>,
}

impl<T> PooledObjectFactory<T> for PrototypeObjects<T>
where
    T: Send + Sync + 'static,
{
    fn create(&self) -> DiResult<Arc<T>> {
        self.prototype.new_prototype_instance()
    }

    fn destroy(&self, instance: Arc<T>) {
        self.prototype.destroy_prototype_instance(&instance);
    }
}

/// Target source that lends targets out of an object pool.
///
/// Each `get_target` borrows an instance and the matching `release_target`
/// gives it back, so callers must release exactly what they obtained (see
/// [`invoke`](crate::target::invoke)). What happens when every instance is
/// lent out is the engine's policy; the default [`BoundedPool`](crate::BoundedPool)
/// waits up to `max_wait` and then fails with
/// [`DiError::PoolExhausted`](crate::DiError::PoolExhausted).
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, PoolConfig, PoolingTargetSource, TargetSource, TargetSpec};
/// use std::sync::Arc;
///
/// struct Connection;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("connection", |_| Connection);
///
/// let pool = PoolingTargetSource::<Connection>::attach(
///     TargetSpec::named("connection"),
///     PoolConfig::with_max_size(2).fail_fast(),
///     Arc::new(registry),
/// )
/// .unwrap();
///
/// let a = pool.get_target().unwrap().unwrap();
/// let _b = pool.get_target().unwrap().unwrap();
/// assert!(pool.get_target().is_err());
///
/// pool.release_target(a).unwrap();
/// assert_eq!(pool.idle_count(), 1);
/// assert!(pool.get_target().is_ok());
/// ```
pub struct PoolingTargetSource<T> {
    prototype: Arc<PrototypeTargetSource<T>>,
    config: PoolConfig,
    pool: Box<dyn PoolEngine<T>>,
}

impl<T> PoolingTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Attaches to `factory` and builds a [`BoundedPool`](crate::BoundedPool).
    pub fn attach(
        spec: TargetSpec<T>,
        config: PoolConfig,
        factory: Arc<dyn ComponentFactory>,
    ) -> DiResult<Self> {
        Self::attach_with_engine(spec, config, factory, &BoundedPoolBuilder)
    }

    /// Attaches to `factory` and lets `engine` build the pool.
    ///
    /// Singleton-scoped components are refused, as for
    /// [`PrototypeTargetSource`].
    pub fn attach_with_engine(
        spec: TargetSpec<T>,
        config: PoolConfig,
        factory: Arc<dyn ComponentFactory>,
        engine: &dyn PoolEngineBuilder<T>,
    ) -> DiResult<Self> {
        config.validate()?;
        let prototype = Arc::new(PrototypeTargetSource::attach_as(spec, factory, KIND)?);
        let objects = Arc::new(PrototypeObjects {
            prototype: prototype.clone(),
        });
        let pool = engine.build_pool(&config, objects)?;

        tracing::debug!(
            component = prototype.base().target_name(),
            max_size = config.max_size,
            "pool attached"
        );
        Ok(Self {
            prototype,
            config,
            pool,
        })
    }
}

impl<T> PoolingTargetSource<T> {
    /// Upper bound on instances, as configured.
    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    /// Instances currently lent out.
    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Instances waiting in the pool.
    pub fn idle_count(&self) -> usize {
        self.pool.idle_count()
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.prototype.state()
    }

    /// The factory binding.
    pub fn prototype(&self) -> &PrototypeTargetSource<T> {
        &self.prototype
    }

    /// Closes the pool, destroying idle instances. Instances still lent out
    /// are destroyed when released. Calling it again does nothing.
    pub fn dispose(&self) {
        if !self.prototype.lifecycle().dispose() {
            return;
        }
        tracing::debug!(
            component = self.prototype.base().target_name(),
            active = self.pool.active_count(),
            idle = self.pool.idle_count(),
            "closing pool"
        );
        self.pool.close();
    }
}

impl<T> TargetSource for PoolingTargetSource<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(self.prototype.base().target_type())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.prototype.lifecycle().enter_use()?;
        self.pool.borrow_object().map(Some)
    }

    fn release_target(&self, target: Arc<T>) -> DiResult<()> {
        self.pool.return_object(target)
    }
}

impl<T> Drop for PoolingTargetSource<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for PoolingTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolingTargetSource")
            .field("prototype", &self.prototype)
            .field("max_size", &self.config.max_size)
            .field("active", &self.pool.active_count())
            .field("idle", &self.pool.idle_count())
            .finish()
    }
}
