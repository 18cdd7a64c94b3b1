//! Target source that defers every decision to the factory.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::factory::ComponentFactory;
use crate::target::factory_backed::{FactoryBacked, TargetSpec};
use crate::traits::TargetSource;

/// Asks the factory for the named component on every call.
///
/// The component's own scope decides what callers see: a singleton
/// component comes back identical each time, a prototype fresh.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, SimpleTargetSource, TargetSource, TargetSpec};
/// use std::sync::Arc;
///
/// struct Settings;
/// struct Session;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_singleton("settings", Settings);
/// registry.add_prototype_factory("session", |_| Session);
/// let registry = Arc::new(registry);
///
/// let settings = SimpleTargetSource::<Settings>::attach(TargetSpec::named("settings"), registry.clone()).unwrap();
/// let sessions = SimpleTargetSource::<Session>::attach(TargetSpec::named("session"), registry).unwrap();
///
/// assert!(Arc::ptr_eq(&settings.get_target().unwrap().unwrap(), &settings.get_target().unwrap().unwrap()));
/// assert!(!Arc::ptr_eq(&sessions.get_target().unwrap().unwrap(), &sessions.get_target().unwrap().unwrap()));
/// ```
pub struct SimpleTargetSource<T> {
    base: FactoryBacked<T>,
}

impl<T> SimpleTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Attaches to `factory`; any component scope is accepted.
    pub fn attach(spec: TargetSpec<T>, factory: Arc<dyn ComponentFactory>) -> DiResult<Self> {
        Ok(Self {
            base: FactoryBacked::attach(spec, factory)?,
        })
    }
}

impl<T> SimpleTargetSource<T> {
    /// The factory binding.
    pub fn base(&self) -> &FactoryBacked<T> {
        &self.base
    }
}

impl<T> TargetSource for SimpleTargetSource<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(self.base.target_type())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.base.new_instance().map(Some)
    }
}

impl<T> PartialEq for SimpleTargetSource<T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl<T> fmt::Debug for SimpleTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleTargetSource")
            .field("base", &self.base)
            .finish()
    }
}
