//! The target source contract.

use std::sync::Arc;

use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;

/// Source of the backing instance an interception proxy delegates to.
///
/// Before each intercepted call the interception layer asks the source for
/// a target with [`get_target`](TargetSource::get_target), dispatches the
/// call to it and then hands it back with
/// [`release_target`](TargetSource::release_target), on every path
/// including failures. [`invoke`](crate::target::invoke) does exactly that.
///
/// Strategies differ in identity semantics:
///
/// | Source | `is_static` | identity across calls |
/// |--------|-------------|-----------------------|
/// | [`EmptyTargetSource`](crate::EmptyTargetSource) | true | no target |
/// | [`SingletonTargetSource`](crate::SingletonTargetSource) | true | always the same |
/// | [`HotSwappableTargetSource`](crate::HotSwappableTargetSource) | false | same until swapped |
/// | [`PrototypeTargetSource`](crate::PrototypeTargetSource) | false | fresh each call |
/// | [`ThreadLocalTargetSource`](crate::ThreadLocalTargetSource) | false | one per thread |
/// | [`PoolingTargetSource`](crate::PoolingTargetSource) | false | borrowed from a pool |
/// | [`LazyInitTargetSource`](crate::LazyInitTargetSource) | false | same after first call |
///
/// # Examples
///
/// ```
/// use ferrous_targets::{SingletonTargetSource, TargetSource};
/// use std::sync::Arc;
///
/// let source = SingletonTargetSource::new(Arc::new(String::from("backend")));
///
/// let target = source.get_target().unwrap().unwrap();
/// assert_eq!(*target, "backend");
/// source.release_target(target).unwrap();
/// assert!(source.is_static());
/// ```
pub trait TargetSource: Send + Sync {
    /// Type handed out by this source.
    type Target: ?Sized + Send + Sync + 'static;

    /// Type of the targets this source returns, or `None` if not yet known.
    fn target_type(&self) -> Option<TypeDescriptor>;

    /// Whether every call to `get_target` returns the same instance.
    ///
    /// Callers may cache the target of a static source instead of calling
    /// `get_target` on every invocation.
    fn is_static(&self) -> bool {
        false
    }

    /// Returns the target to delegate to, or `None` when there is none.
    fn get_target(&self) -> DiResult<Option<Arc<Self::Target>>>;

    /// Hands back a target obtained from `get_target`.
    ///
    /// The default does nothing; only strategies that lend instances need it.
    fn release_target(&self, target: Arc<Self::Target>) -> DiResult<()> {
        drop(target);
        Ok(())
    }
}
