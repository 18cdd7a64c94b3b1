//! Per-call target source: a fresh target for every invocation.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::TypeDescriptor;
use crate::error::{DiError, DiResult};
use crate::factory::ComponentFactory;
use crate::internal::{Lifecycle, LifecycleState};
use crate::target::factory_backed::{FactoryBacked, TargetSpec};
use crate::traits::TargetSource;

/// Target source that creates a new target on every call.
///
/// The target component must be prototype-scoped: attaching to a singleton
/// component fails, because the per-call contract (every call gets an
/// independent instance) would silently degrade to a shared one.
///
/// This is also the instance-creating core of
/// [`ThreadLocalTargetSource`](crate::ThreadLocalTargetSource) and
/// [`PoolingTargetSource`](crate::PoolingTargetSource).
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, PrototypeTargetSource, TargetSource, TargetSpec};
/// use std::sync::Arc;
///
/// struct Request { id: u64 }
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("request", |_| Request { id: 7 });
///
/// let source = PrototypeTargetSource::<Request>::attach(TargetSpec::named("request"), Arc::new(registry)).unwrap();
/// let a = source.get_target().unwrap().unwrap();
/// let b = source.get_target().unwrap().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert_eq!(a.id, b.id);
/// ```
pub struct PrototypeTargetSource<T> {
    base: FactoryBacked<T>,
    lifecycle: Lifecycle,
}

impl<T> PrototypeTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Attaches to `factory`, refusing singleton-scoped components.
    pub fn attach(spec: TargetSpec<T>, factory: Arc<dyn ComponentFactory>) -> DiResult<Self> {
        Self::attach_as(spec, factory, "PrototypeTargetSource")
    }

    pub(crate) fn attach_as(
        spec: TargetSpec<T>,
        factory: Arc<dyn ComponentFactory>,
        kind: &'static str,
    ) -> DiResult<Self> {
        // Scope first: resolving an undeclared type may build the component.
        if let Some(name) = spec.name() {
            if factory.is_singleton(name)? {
                return Err(DiError::SingletonScope(name.to_string()));
            }
        }
        let base = FactoryBacked::attach(spec, factory)?;

        Ok(Self {
            base,
            lifecycle: Lifecycle::new(kind),
        })
    }

    /// Creates a new target instance from the factory.
    pub fn new_prototype_instance(&self) -> DiResult<Arc<T>> {
        tracing::debug!(component = self.base.target_name(), "creating new target instance");
        self.base.new_instance()
    }
}

impl<T> PrototypeTargetSource<T> {
    /// Runs the destroy hook on an instance this source created.
    pub fn destroy_prototype_instance(&self, instance: &T) -> bool {
        tracing::debug!(component = self.base.target_name(), "destroying target instance");
        self.base.destroy_instance(instance)
    }

    /// The factory binding.
    pub fn base(&self) -> &FactoryBacked<T> {
        &self.base
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Stops handing out targets. Instances already handed out are the
    /// callers' to drop.
    pub fn dispose(&self) {
        self.lifecycle.dispose();
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl<T> TargetSource for PrototypeTargetSource<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(self.base.target_type())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.lifecycle.enter_use()?;
        self.new_prototype_instance().map(Some)
    }
}

impl<T> fmt::Debug for PrototypeTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeTargetSource")
            .field("base", &self.base)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
