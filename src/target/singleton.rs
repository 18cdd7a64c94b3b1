//! Target source holding one fixed target.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::traits::TargetSource;

/// Target source that always returns the same target.
///
/// This is what a proxy uses when it is handed a plain object. It is static,
/// so the interception layer may cache the target. Two singleton sources are
/// equal when their targets are equal, which lets one be substituted for
/// another wrapping an equivalent value.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{SingletonTargetSource, TargetSource};
/// use std::sync::Arc;
///
/// let a = SingletonTargetSource::from_value(String::from("db"));
/// let b = SingletonTargetSource::from_value(String::from("db"));
/// assert_eq!(a, b);
///
/// let first = a.get_target().unwrap().unwrap();
/// let second = a.get_target().unwrap().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct SingletonTargetSource<T: ?Sized> {
    target: Arc<T>,
}

impl<T> SingletonTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Wraps a shared target.
    pub fn new(target: Arc<T>) -> Self {
        Self { target }
    }

    /// The wrapped target.
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }
}

impl<T> SingletonTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Wraps an owned value.
    pub fn from_value(value: T) -> Self {
        Self::new(Arc::new(value))
    }
}

impl<T> TargetSource for SingletonTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::of::<T>())
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        Ok(Some(self.target.clone()))
    }
}

impl<T: ?Sized + PartialEq> PartialEq for SingletonTargetSource<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.target == *other.target
    }
}

impl<T: ?Sized + Eq> Eq for SingletonTargetSource<T> {}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SingletonTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonTargetSource")
            .field("target", &self.target)
            .finish()
    }
}

impl<T: ?Sized> Clone for SingletonTargetSource<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}
