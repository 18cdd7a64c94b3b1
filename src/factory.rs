//! Component factory contract and an in-memory implementation.
//!
//! Factory-backed target sources never construct targets themselves: they
//! ask a [`ComponentFactory`] for a named component. The factory is shared
//! and read-only from the target source's point of view.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptors::{ComponentDescriptor, TypeDescriptor};
use crate::error::{BoxError, DiError, DiResult};
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Ctor, Registration, Registry};

/// Factory that creates named components and reports their declared scope and type.
///
/// Target sources call [`create_instance`](ComponentFactory::create_instance)
/// once per instance they need, and the scope/type queries once, when they
/// attach.
pub trait ComponentFactory: Send + Sync {
    /// Returns the component registered under `name`.
    ///
    /// Singleton components come back identical on every call; prototype
    /// components are created fresh.
    fn create_instance(&self, name: &str) -> DiResult<AnyArc>;

    /// Whether the component is declared singleton-scoped.
    fn is_singleton(&self, name: &str) -> DiResult<bool>;

    /// Declared type of the component, without creating it.
    ///
    /// `Ok(None)` means the factory cannot tell from the declaration alone.
    fn declared_type(&self, _name: &str) -> DiResult<Option<TypeDescriptor>> {
        Ok(None)
    }
}

/// Downcasts a factory-created instance to the requested type.
pub(crate) fn downcast_instance<T>(name: &str, instance: AnyArc) -> DiResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    instance.downcast::<T>().map_err(|_| DiError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
        found: "an unrelated type",
    })
}

fn ctor<F>(f: F) -> Ctor
where
    F: Fn(&ComponentRegistry) -> DiResult<AnyArc> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// In-memory component factory with named singleton and prototype registrations.
///
/// Constructors receive the registry itself so they can pull in their own
/// dependencies by name.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, ComponentFactory};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Client { config: Arc<Config> }
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_singleton("config", Config { url: "postgres://localhost".to_string() });
/// registry.add_prototype_factory("client", |r| Client {
///     config: r.get::<Config>("config").unwrap(),
/// });
///
/// let a = registry.get::<Client>("client").unwrap();
/// let b = registry.get::<Client>("client").unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.config, &b.config));
/// assert!(registry.is_singleton("config").unwrap());
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    registry: Registry,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made singleton instance.
    pub fn add_singleton<T>(&mut self, name: impl Into<String>, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        let value: AnyArc = Arc::new(value);
        self.insert::<T>(
            name.into(),
            Lifetime::Singleton,
            ctor(move |_| Ok(value.clone())),
            true,
        )
    }

    /// Registers a singleton created on first request.
    pub fn add_singleton_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ComponentRegistry) -> T + Send + Sync + 'static,
    {
        self.insert::<T>(
            name.into(),
            Lifetime::Singleton,
            ctor(move |r| Ok(Arc::new(factory(r)) as AnyArc)),
            true,
        )
    }

    /// Registers a prototype: every request creates a new instance.
    pub fn add_prototype_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ComponentRegistry) -> T + Send + Sync + 'static,
    {
        self.insert::<T>(
            name.into(),
            Lifetime::Prototype,
            ctor(move |r| Ok(Arc::new(factory(r)) as AnyArc)),
            true,
        )
    }

    /// Registers a prototype whose constructor may fail.
    pub fn add_prototype_try_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ComponentRegistry) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let component = name.clone();
        self.insert::<T>(
            name,
            Lifetime::Prototype,
            ctor(move |r| {
                factory(r)
                    .map(|v| Arc::new(v) as AnyArc)
                    .map_err(|e| DiError::creation_failed(&component, e))
            }),
            true,
        )
    }

    /// Registers a prototype without declaring its type.
    ///
    /// [`declared_type`](ComponentFactory::declared_type) answers `None` for
    /// it, so target sources have to create an instance to learn the type.
    pub fn add_untyped_prototype<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ComponentRegistry) -> T + Send + Sync + 'static,
    {
        self.insert::<T>(
            name.into(),
            Lifetime::Prototype,
            ctor(move |r| Ok(Arc::new(factory(r)) as AnyArc)),
            false,
        )
    }

    fn insert<T: Any>(
        &mut self,
        name: String,
        lifetime: Lifetime,
        ctor: Ctor,
        typed: bool,
    ) -> &mut Self {
        let target_type = typed.then(TypeDescriptor::of::<T>);
        self.registry.insert(name, Registration::new(lifetime, ctor, target_type));
        self
    }

    /// Resolves a component and downcasts it to `T`.
    pub fn get<T>(&self, name: &str) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.create_instance(name)?;
        downcast_instance(name, instance)
    }

    /// Declared lifetime of a component, if registered.
    pub fn lifetime_of(&self, name: &str) -> Option<Lifetime> {
        self.registry.get(name).map(|r| r.lifetime)
    }

    /// Whether a component is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.get(name).is_some()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptors of every registration, sorted by name.
    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.registry.descriptors()
    }

    fn registration(&self, name: &str) -> DiResult<&Registration> {
        self.registry
            .get(name)
            .ok_or_else(|| DiError::NotFound(name.to_string()))
    }
}

impl ComponentFactory for ComponentRegistry {
    fn create_instance(&self, name: &str) -> DiResult<AnyArc> {
        let registration = self.registration(name)?;
        match &registration.single_runtime {
            Some(cell) => cell
                .get_or_try_init(|| (registration.ctor)(self))
                .map(Arc::clone),
            None => (registration.ctor)(self),
        }
    }

    fn is_singleton(&self, name: &str) -> DiResult<bool> {
        Ok(self.registration(name)?.lifetime.is_singleton())
    }

    fn declared_type(&self, name: &str) -> DiResult<Option<TypeDescriptor>> {
        Ok(self.registration(name)?.target_type)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.descriptors())
            .finish()
    }
}
