//! Disposal trait for target instances.

use crate::error::BoxError;

/// Trait for targets that need structured teardown.
///
/// Implement this for targets that hold resources (connections, file
/// handles, buffers to flush). Target sources that own their instances call
/// it when they destroy one: on pool eviction and close, and when a
/// thread-local source is disposed. Wire it in with
/// [`TargetSpec::disposing`](crate::TargetSpec::disposing).
///
/// A failing `dispose` never stops the disposal of other instances; the
/// error is logged and dropped.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{BoxError, Dispose, TargetSpec};
///
/// struct Connection {
///     id: u32,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) -> Result<(), BoxError> {
///         println!("Closing connection {}", self.id);
///         Ok(())
///     }
/// }
///
/// let spec = TargetSpec::<Connection>::named("connection").disposing();
/// assert!(spec.has_destroy_hook());
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release the resources held by this instance.
    fn dispose(&self) -> Result<(), BoxError>;
}
