//! Shared base for target sources that obtain targets from a component factory.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::TypeDescriptor;
use crate::error::{BoxError, DiError, DiResult};
use crate::factory::{downcast_instance, ComponentFactory};
use crate::internal::destroy::DestroyHook;
use crate::internal::destroy_quietly;
use crate::traits::Dispose;

/// Configuration of a factory-backed target source before it is attached.
///
/// Holds the component name, an optional explicit type (which spares the
/// factory a type query) and an optional destroy hook run whenever the
/// target source destroys one of its instances.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{TargetSpec, TypeDescriptor};
///
/// struct Worker;
///
/// let spec = TargetSpec::<Worker>::named("worker")
///     .with_target_type(TypeDescriptor::of::<Worker>())
///     .with_destroy_hook(|_w: &Worker| Ok(()));
///
/// assert_eq!(spec.name(), Some("worker"));
/// assert!(spec.has_destroy_hook());
/// ```
pub struct TargetSpec<T> {
    target_name: Option<String>,
    target_type: Option<TypeDescriptor>,
    destroy_hook: Option<DestroyHook<T>>,
}

impl<T> TargetSpec<T>
where
    T: Send + Sync + 'static,
{
    /// Empty configuration; attaching it fails until a name is set.
    pub fn new() -> Self {
        Self {
            target_name: None,
            target_type: None,
            destroy_hook: None,
        }
    }

    /// Configuration for the component registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_target_name(name)
    }

    /// Sets the component name.
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// Declares the target type up front instead of asking the factory.
    pub fn with_target_type(mut self, target_type: TypeDescriptor) -> Self {
        self.target_type = Some(target_type);
        self
    }

    /// Runs `hook` on every instance this source destroys.
    pub fn with_destroy_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy_hook = Some(Arc::new(hook));
        self
    }

    /// The configured component name.
    pub fn name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Whether a destroy hook is configured.
    pub fn has_destroy_hook(&self) -> bool {
        self.destroy_hook.is_some()
    }
}

impl<T: Dispose> TargetSpec<T> {
    /// Uses [`Dispose::dispose`] as the destroy hook.
    pub fn disposing(self) -> Self {
        self.with_destroy_hook(|target: &T| target.dispose())
    }
}

impl<T: Send + Sync + 'static> Default for TargetSpec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TargetSpec<T> {
    fn clone(&self) -> Self {
        Self {
            target_name: self.target_name.clone(),
            target_type: self.target_type,
            destroy_hook: self.destroy_hook.clone(),
        }
    }
}

impl<T> fmt::Debug for TargetSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSpec")
            .field("target_name", &self.target_name)
            .field("target_type", &self.target_type)
            .field("destroy_hook", &self.destroy_hook.is_some())
            .finish()
    }
}

/// A component name bound to a factory, with the component's type resolved.
///
/// Every factory-backed target source embeds one. Attaching validates the
/// configuration once; afterwards the name and type never change and the
/// factory is only asked for instances.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, FactoryBacked, TargetSpec};
/// use std::sync::Arc;
///
/// struct Report;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("report", |_| Report);
///
/// let base = FactoryBacked::<Report>::attach(TargetSpec::named("report"), Arc::new(registry)).unwrap();
/// assert_eq!(base.target_name(), "report");
/// assert!(base.target_type().is::<Report>());
/// let _report = base.new_instance().unwrap();
/// ```
pub struct FactoryBacked<T> {
    target_name: String,
    factory: Arc<dyn ComponentFactory>,
    target_type: TypeDescriptor,
    destroy_hook: Option<DestroyHook<T>>,
}

impl<T> FactoryBacked<T>
where
    T: Send + Sync + 'static,
{
    /// Validates `spec` against `factory` and binds them.
    ///
    /// Fails with [`DiError::MissingTargetName`] without a name,
    /// [`DiError::NotFound`] if the factory does not know the name and
    /// [`DiError::TypeMismatch`] if the component is not a `T`.
    pub fn attach(spec: TargetSpec<T>, factory: Arc<dyn ComponentFactory>) -> DiResult<Self> {
        let target_name = spec.target_name.ok_or(DiError::MissingTargetName)?;
        let target_type = match spec.target_type {
            Some(target_type) => target_type,
            None => Self::discover_type(&target_name, factory.as_ref())?,
        };

        if !target_type.is::<T>() {
            return Err(DiError::TypeMismatch {
                name: target_name,
                expected: std::any::type_name::<T>(),
                found: target_type.name(),
            });
        }

        Ok(Self {
            target_name,
            factory,
            target_type,
            destroy_hook: spec.destroy_hook,
        })
    }

    fn discover_type(name: &str, factory: &dyn ComponentFactory) -> DiResult<TypeDescriptor> {
        if let Some(target_type) = factory.declared_type(name)? {
            return Ok(target_type);
        }

        // Expensive: the only way left to learn the type is to build one.
        tracing::warn!(
            component = name,
            "factory cannot declare the component type; creating an instance to determine it"
        );
        let probe = factory.create_instance(name)?;
        if probe.is::<T>() {
            Ok(TypeDescriptor::of::<T>())
        } else {
            Err(DiError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                found: "an unrelated type",
            })
        }
    }

    /// Asks the factory for the component.
    pub fn new_instance(&self) -> DiResult<Arc<T>> {
        let instance = self.factory.create_instance(&self.target_name)?;
        downcast_instance(&self.target_name, instance)
    }
}

impl<T> FactoryBacked<T> {
    /// Name of the target component.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// The factory targets are obtained from.
    pub fn factory(&self) -> &Arc<dyn ComponentFactory> {
        &self.factory
    }

    /// Type of the target component, resolved at attach time.
    pub fn target_type(&self) -> TypeDescriptor {
        self.target_type
    }

    /// Runs the destroy hook on `instance`, if one is configured.
    ///
    /// Failures are logged and reported as `false`, never propagated.
    pub fn destroy_instance(&self, instance: &T) -> bool {
        match &self.destroy_hook {
            Some(hook) => destroy_quietly(&self.target_name, hook, instance),
            None => true,
        }
    }

    pub(crate) fn destroy_hook(&self) -> Option<&DestroyHook<T>> {
        self.destroy_hook.as_ref()
    }
}

impl<T> PartialEq for FactoryBacked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target_name == other.target_name && self.target_type == other.target_type
    }
}

impl<T> fmt::Debug for FactoryBacked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryBacked")
            .field("target_name", &self.target_name)
            .field("target_type", &self.target_type)
            .finish()
    }
}
