//! Target source with no target at all.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::traits::TargetSource;

static CANONICAL: Lazy<Arc<EmptyTargetSource>> = Lazy::new(|| {
    Arc::new(EmptyTargetSource {
        target_type: None,
        is_static: true,
    })
});

/// Target source used when there is no target and all behavior is supplied
/// by the interception layer itself.
///
/// `get_target()` always answers `Ok(None)`. Without a declared type and
/// with static semantics the process-wide canonical instance is returned;
/// every other combination gets its own instance.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{EmptyTargetSource, TargetSource, TypeDescriptor};
/// use std::sync::Arc;
///
/// let empty = EmptyTargetSource::instance();
/// assert!(empty.get_target().unwrap().is_none());
/// assert!(Arc::ptr_eq(&empty, &EmptyTargetSource::for_type(None)));
///
/// struct Audit;
/// let typed = EmptyTargetSource::for_type(Some(TypeDescriptor::of::<Audit>()));
/// assert!(typed.target_type().unwrap().is::<Audit>());
/// assert!(!Arc::ptr_eq(&empty, &typed));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyTargetSource {
    target_type: Option<TypeDescriptor>,
    is_static: bool,
}

impl EmptyTargetSource {
    /// The canonical untyped, static instance.
    pub fn instance() -> Arc<Self> {
        CANONICAL.clone()
    }

    /// Empty source reporting the given type, with static semantics.
    pub fn for_type(target_type: Option<TypeDescriptor>) -> Arc<Self> {
        Self::for_type_and_staticity(target_type, true)
    }

    /// Empty source reporting the given type and staticity.
    pub fn for_type_and_staticity(target_type: Option<TypeDescriptor>, is_static: bool) -> Arc<Self> {
        if target_type.is_none() && is_static {
            Self::instance()
        } else {
            Arc::new(Self {
                target_type,
                is_static,
            })
        }
    }
}

impl TargetSource for EmptyTargetSource {
    type Target = dyn Any + Send + Sync;

    fn target_type(&self) -> Option<TypeDescriptor> {
        self.target_type
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn get_target(&self) -> DiResult<Option<Arc<Self::Target>>> {
        Ok(None)
    }
}
