//! Type and component descriptors for introspection.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::lifetime::Lifetime;

/// Explicit description of a target's type
///
/// Target sources report the type of whatever `get_target()` would return
/// through this descriptor instead of inspecting a resolved instance. The
/// `TypeId` is authoritative for equality; the name is kept for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_targets::TypeDescriptor;
///
/// struct Counter;
///
/// let ty = TypeDescriptor::of::<Counter>();
/// assert!(ty.is::<Counter>());
/// assert!(ty.name().ends_with("Counter"));
/// assert_ne!(ty, TypeDescriptor::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Describes `T`. Works for unsized types such as trait objects.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the described type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this descriptor describes `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Component descriptor for introspection and diagnostics
///
/// Describes one named registration in a
/// [`ComponentRegistry`](crate::ComponentRegistry): its name, declared
/// lifetime and, when known without creating it, its type.
///
/// # Examples
///
/// ```rust
/// use ferrous_targets::{ComponentRegistry, Lifetime};
///
/// struct Database;
/// struct Session;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_singleton("db", Database);
/// registry.add_prototype_factory("session", |_| Session);
///
/// let descriptors = registry.descriptors();
/// let session = descriptors.iter().find(|d| d.name == "session").unwrap();
/// assert_eq!(session.lifetime, Lifetime::Prototype);
/// assert!(session.target_type.unwrap().is::<Session>());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Registration name
    pub name: String,
    /// Declared lifetime
    pub lifetime: Lifetime,
    /// Declared type, `None` for untyped registrations
    pub target_type: Option<TypeDescriptor>,
}

impl ComponentDescriptor {
    /// Returns true if asking the factory twice yields the same instance.
    pub fn is_singleton(&self) -> bool {
        self.lifetime.is_singleton()
    }
}
