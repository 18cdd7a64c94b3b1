//! Internal implementation details.

pub(crate) mod destroy;
pub(crate) mod lifecycle;

pub(crate) use destroy::{destroy_all, destroy_quietly};
pub use lifecycle::LifecycleState;
pub(crate) use lifecycle::Lifecycle;
