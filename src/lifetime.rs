//! Component lifetime definitions.

/// Declared scope of a component in a [`ComponentFactory`](crate::ComponentFactory)
///
/// Target sources only care about one distinction: whether asking the
/// factory twice for the same name yields the same instance or two
/// independent ones. Per-call, thread-local and pooled target sources refuse
/// to attach to singleton components.
///
/// # Examples
///
/// ```rust
/// use ferrous_targets::{ComponentRegistry, ComponentFactory, Lifetime};
///
/// struct Session;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("session", |_| Session);
///
/// assert_eq!(registry.lifetime_of("session"), Some(Lifetime::Prototype));
/// assert!(!registry.is_singleton("session").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single shared instance, created once and cached by the factory
    Singleton,
    /// New independent instance on every request
    Prototype,
}

impl Lifetime {
    /// Returns true for [`Lifetime::Singleton`].
    pub fn is_singleton(self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}
