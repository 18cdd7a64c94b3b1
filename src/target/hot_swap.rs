//! Target source whose target can be replaced at runtime.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptors::TypeDescriptor;
use crate::error::{DiError, DiResult};
use crate::traits::TargetSource;

/// Target source whose target can be swapped while proxies are in use.
///
/// Reads and swaps take the same mutex, held only for the pointer copy, so
/// a caller never observes a half-replaced target. Callers that already hold
/// the old target keep using it until they release it. The source is not
/// static, since the target may change between calls.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{HotSwappableTargetSource, TargetSource};
/// use std::sync::Arc;
///
/// let a = Arc::new(String::from("primary"));
/// let b = Arc::new(String::from("standby"));
/// let source = HotSwappableTargetSource::new(a.clone());
///
/// let old = source.swap(b.clone()).unwrap();
/// assert!(Arc::ptr_eq(&old, &a));
/// assert!(Arc::ptr_eq(&source.get_target().unwrap().unwrap(), &b));
///
/// // An absent target is refused and leaves the slot untouched
/// assert!(source.swap(None).is_err());
/// assert!(Arc::ptr_eq(&source.get_target().unwrap().unwrap(), &b));
/// ```
pub struct HotSwappableTargetSource<T: ?Sized> {
    target: Mutex<Arc<T>>,
}

impl<T> HotSwappableTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Creates the source with its initial target.
    pub fn new(initial: Arc<T>) -> Self {
        Self {
            target: Mutex::new(initial),
        }
    }

    /// Replaces the target and returns the previous one.
    ///
    /// Fails with [`DiError::InvalidSwap`] if `new_target` is `None`; the
    /// current target is kept in that case.
    pub fn swap(&self, new_target: impl Into<Option<Arc<T>>>) -> DiResult<Arc<T>> {
        let new_target = new_target.into().ok_or(DiError::InvalidSwap)?;
        let old = std::mem::replace(&mut *self.target.lock(), new_target);
        tracing::debug!(target_type = std::any::type_name::<T>(), "swapped target");
        Ok(old)
    }
}

impl<T> TargetSource for HotSwappableTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::of::<T>())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        Ok(Some(self.target.lock().clone()))
    }
}
