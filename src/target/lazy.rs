//! Lazily materialized single targets.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::factory::ComponentFactory;
use crate::internal::{Lifecycle, LifecycleState};
use crate::target::factory_backed::{FactoryBacked, TargetSpec};
use crate::traits::TargetSource;

type CreateFn<T> = Box<dyn Fn() -> DiResult<Arc<T>> + Send + Sync>;
type PostProcessFn<T> = Box<dyn Fn(&T) -> DiResult<()> + Send + Sync>;

/// Single-instance cell shared by both lazy variants.
///
/// Reads take the lock-free fast path once the target exists. Creation runs
/// under a mutex and re-checks the cell, so concurrent first calls still
/// create exactly one target.
struct LazyCell<T: ?Sized> {
    target: OnceCell<Arc<T>>,
    creating: Mutex<()>,
    post_process: Option<PostProcessFn<T>>,
    lifecycle: Lifecycle,
}

impl<T: ?Sized> LazyCell<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            target: OnceCell::new(),
            creating: Mutex::new(()),
            post_process: None,
            lifecycle: Lifecycle::new(kind),
        }
    }

    fn get_or_create(&self, component: &str, create: impl FnOnce() -> DiResult<Arc<T>>) -> DiResult<Arc<T>> {
        self.lifecycle.enter_use()?;
        if let Some(target) = self.target.get() {
            tracing::trace!(component, "lazy target already initialized");
            return Ok(target.clone());
        }

        let _creating = self.creating.lock();
        if let Some(target) = self.target.get() {
            return Ok(target.clone());
        }
        // A dispose may have landed while this thread waited for the lock.
        self.lifecycle.enter_use()?;

        tracing::debug!(component, "initializing lazy target");
        let target = create()?;
        if let Some(post_process) = &self.post_process {
            post_process(&target)?;
        }
        // Only this thread sets the cell, under the lock.
        let _ = self.target.set(target.clone());
        Ok(target)
    }

    fn is_initialized(&self) -> bool {
        self.target.get().is_some()
    }

    /// Waits out an in-flight creation, so a target published before
    /// disposal is visible to the caller afterwards.
    fn dispose(&self) -> bool {
        let _creating = self.creating.lock();
        self.lifecycle.dispose()
    }
}

/// Lazy target source whose target comes from a creation closure.
///
/// The closure runs on the first `get_target` call and never again; every
/// later call returns the same target. The target type is only reported
/// once the target exists.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{LazyCreationTargetSource, TargetSource};
/// use std::sync::Arc;
///
/// struct Index { entries: Vec<String> }
///
/// let source = LazyCreationTargetSource::new("index", || {
///     Ok(Arc::new(Index { entries: vec!["a".to_string()] }))
/// });
/// assert!(!source.is_initialized());
/// assert!(source.target_type().is_none());
///
/// let a = source.get_target().unwrap().unwrap();
/// let b = source.get_target().unwrap().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(source.target_type().unwrap().is::<Index>());
/// ```
pub struct LazyCreationTargetSource<T: ?Sized> {
    name: String,
    create: CreateFn<T>,
    cell: LazyCell<T>,
}

impl<T> LazyCreationTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Creates a source named `name` (used in logs) around `create`.
    pub fn new<F>(name: impl Into<String>, create: F) -> Self
    where
        F: Fn() -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            create: Box::new(create),
            cell: LazyCell::new("LazyCreationTargetSource"),
        }
    }

    /// Runs `hook` once on the new target before any caller sees it.
    ///
    /// A failing hook fails that `get_target` call and leaves the source
    /// uninitialized, so the next call creates again.
    pub fn with_post_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> DiResult<()> + Send + Sync + 'static,
    {
        self.cell.post_process = Some(Box::new(hook));
        self
    }
}

impl<T: ?Sized> LazyCreationTargetSource<T> {
    /// Whether the target has been created.
    pub fn is_initialized(&self) -> bool {
        self.cell.is_initialized()
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.cell.lifecycle.state()
    }

    /// Refuses further `get_target` calls. The target, if any, is released
    /// when the source is dropped.
    pub fn dispose(&self) {
        self.cell.dispose();
    }
}

impl<T> TargetSource for LazyCreationTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        self.cell.is_initialized().then(TypeDescriptor::of::<T>)
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.cell
            .get_or_create(&self.name, || (self.create)())
            .map(Some)
    }
}

impl<T: ?Sized> fmt::Debug for LazyCreationTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCreationTargetSource")
            .field("name", &self.name)
            .field("initialized", &self.cell.is_initialized())
            .field("state", &self.cell.lifecycle.state())
            .finish()
    }
}

/// Lazy target source whose target is a named factory component.
///
/// Attaching only resolves the component's type; the factory is asked for
/// the instance on the first `get_target` call. Unlike the per-call sources
/// this accepts singleton components too, deferring their creation.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, LazyInitTargetSource, TargetSource, TargetSpec};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// static BUILT: AtomicUsize = AtomicUsize::new(0);
/// struct Catalog;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("catalog", |_| {
///     BUILT.fetch_add(1, Ordering::SeqCst);
///     Catalog
/// });
///
/// let source = LazyInitTargetSource::<Catalog>::attach(TargetSpec::named("catalog"), Arc::new(registry)).unwrap();
/// assert!(source.target_type().unwrap().is::<Catalog>());
/// assert_eq!(BUILT.load(Ordering::SeqCst), 0);
///
/// source.get_target().unwrap();
/// source.get_target().unwrap();
/// assert_eq!(BUILT.load(Ordering::SeqCst), 1);
/// ```
pub struct LazyInitTargetSource<T> {
    base: FactoryBacked<T>,
    cell: LazyCell<T>,
}

impl<T> LazyInitTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Attaches to `factory` without creating the component.
    pub fn attach(spec: TargetSpec<T>, factory: Arc<dyn ComponentFactory>) -> DiResult<Self> {
        Ok(Self {
            base: FactoryBacked::attach(spec, factory)?,
            cell: LazyCell::new("LazyInitTargetSource"),
        })
    }

    /// Runs `hook` once on the new target before any caller sees it.
    pub fn with_post_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> DiResult<()> + Send + Sync + 'static,
    {
        self.cell.post_process = Some(Box::new(hook));
        self
    }
}

impl<T> LazyInitTargetSource<T> {
    /// Whether the target has been created.
    pub fn is_initialized(&self) -> bool {
        self.cell.is_initialized()
    }

    /// The factory binding.
    pub fn base(&self) -> &FactoryBacked<T> {
        &self.base
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.cell.lifecycle.state()
    }

    /// Refuses further `get_target` calls. A created prototype target is
    /// handed to the destroy hook.
    pub fn dispose(&self) {
        if !self.cell.dispose() {
            return;
        }
        if let Some(target) = self.cell.target.get() {
            let singleton = self
                .base
                .factory()
                .is_singleton(self.base.target_name())
                .unwrap_or(true);
            if !singleton {
                self.base.destroy_instance(target);
            }
        }
    }
}

impl<T> TargetSource for LazyInitTargetSource<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(self.base.target_type())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.cell
            .get_or_create(self.base.target_name(), || self.base.new_instance())
            .map(Some)
    }
}

impl<T> fmt::Debug for LazyInitTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInitTargetSource")
            .field("base", &self.base)
            .field("initialized", &self.cell.is_initialized())
            .field("state", &self.cell.lifecycle.state())
            .finish()
    }
}

