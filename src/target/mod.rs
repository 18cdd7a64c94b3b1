//! Target source strategies.
//!
//! Every strategy implements [`TargetSource`]. The static ones
//! ([`EmptyTargetSource`], [`SingletonTargetSource`]) need no factory; the
//! rest obtain instances from a [`ComponentFactory`](crate::ComponentFactory)
//! through a shared [`FactoryBacked`] binding, except
//! [`HotSwappableTargetSource`] and the closure-driven lazy and refreshable
//! variants.

mod empty;
mod factory_backed;
mod hot_swap;
mod lazy;
mod pooling;
mod prototype;
mod refreshable;
mod simple;
mod singleton;
mod thread_local;

use std::sync::Arc;

use crate::error::DiResult;
use crate::traits::TargetSource;

pub use empty::EmptyTargetSource;
pub use factory_backed::{FactoryBacked, TargetSpec};
pub use hot_swap::HotSwappableTargetSource;
pub use lazy::{LazyCreationTargetSource, LazyInitTargetSource};
pub use pooling::PoolingTargetSource;
pub use prototype::PrototypeTargetSource;
pub use refreshable::RefreshableTargetSource;
pub use simple::SimpleTargetSource;
pub use singleton::SingletonTargetSource;
pub use thread_local::{ThreadLocalStats, ThreadLocalTargetSource};

/// Gives a target back to its source when dropped, unless already released.
struct ReleaseGuard<'a, S: TargetSource + ?Sized> {
    source: &'a S,
    target: Option<Arc<S::Target>>,
}

impl<S: TargetSource + ?Sized> ReleaseGuard<'_, S> {
    fn release(mut self) -> DiResult<()> {
        match self.target.take() {
            Some(target) => self.source.release_target(target),
            None => Ok(()),
        }
    }
}

impl<S: TargetSource + ?Sized> Drop for ReleaseGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            if let Err(error) = self.source.release_target(target) {
                tracing::warn!(%error, "failed to release target while unwinding");
            }
        }
    }
}

/// Runs `f` against a target from `source`, then releases the target.
///
/// The target is released on every path, including when `f` panics, so
/// lending strategies such as [`PoolingTargetSource`] never leak an
/// instance. `f` gets `None` from sources without a target.
///
/// # Examples
///
/// ```
/// use ferrous_targets::target::invoke;
/// use ferrous_targets::{ComponentRegistry, PoolConfig, PoolingTargetSource, TargetSpec};
/// use std::sync::Arc;
///
/// struct Parser;
/// impl Parser {
///     fn parse(&self, input: &str) -> usize { input.len() }
/// }
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("parser", |_| Parser);
/// let pool = PoolingTargetSource::<Parser>::attach(
///     TargetSpec::named("parser"),
///     PoolConfig::with_max_size(1),
///     Arc::new(registry),
/// )
/// .unwrap();
///
/// let len = invoke(&pool, |parser| parser.unwrap().parse("abc")).unwrap();
/// assert_eq!(len, 3);
/// assert_eq!(pool.active_count(), 0);
/// ```
pub fn invoke<S, F, R>(source: &S, f: F) -> DiResult<R>
where
    S: TargetSource + ?Sized,
    F: FnOnce(Option<&S::Target>) -> R,
{
    let guard = ReleaseGuard {
        source,
        target: source.get_target()?,
    };
    let result = f(guard.target.as_deref());
    guard.release()?;
    Ok(result)
}
