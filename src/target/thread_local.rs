//! Per-thread target source: one target per calling thread.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::descriptors::TypeDescriptor;
use crate::error::{DiError, DiResult};
use crate::factory::ComponentFactory;
use crate::internal::{destroy_all, LifecycleState};
use crate::target::factory_backed::TargetSpec;
use crate::target::prototype::PrototypeTargetSource;
use crate::traits::TargetSource;

const KIND: &str = "ThreadLocalTargetSource";

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// A thread's cached target for one source.
///
/// Slots hold weak references; the strong ones live in the source's tracked
/// set, so disposing the source invalidates every thread's slot at once.
trait ThreadSlot {
    fn is_live(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Send + Sync + 'static> ThreadSlot for Weak<T> {
    fn is_live(&self) -> bool {
        self.strong_count() > 0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

thread_local! {
    // Only the owning thread touches its map, so no locking is needed.
    static THREAD_TARGETS: RefCell<HashMap<u64, Box<dyn ThreadSlot>>> = RefCell::new(HashMap::new());
}

/// Usage statistics of a [`ThreadLocalTargetSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadLocalStats {
    /// Total number of `get_target` calls
    pub invocation_count: u64,
    /// Calls answered from the calling thread's cached target
    pub hit_count: u64,
    /// Distinct targets created and still tracked
    pub object_count: usize,
}

impl ThreadLocalStats {
    /// Calls that had to create a target.
    pub fn miss_count(&self) -> u64 {
        self.invocation_count.saturating_sub(self.hit_count)
    }
}

/// Target source that binds one target to each calling thread.
///
/// The first call on a thread creates a target from a prototype-scoped
/// component and caches it in that thread's slot; later calls on the same
/// thread get it back without locking. Every created target is also kept in
/// a mutex-guarded set, used only to destroy them all on
/// [`dispose`](ThreadLocalTargetSource::dispose).
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ComponentRegistry, TargetSource, TargetSpec, ThreadLocalTargetSource};
/// use std::sync::Arc;
///
/// struct Buffer(Vec<u8>);
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_prototype_factory("buffer", |_| Buffer(Vec::with_capacity(1024)));
///
/// let source = Arc::new(
///     ThreadLocalTargetSource::<Buffer>::attach(TargetSpec::named("buffer"), Arc::new(registry)).unwrap(),
/// );
///
/// let a = source.get_target().unwrap().unwrap();
/// let b = source.get_target().unwrap().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let other = {
///     let source = source.clone();
///     std::thread::spawn(move || source.get_target().unwrap().unwrap()).join().unwrap()
/// };
/// assert!(!Arc::ptr_eq(&a, &other));
/// assert_eq!(source.stats().object_count, 2);
/// assert_eq!(source.stats().hit_count, 1);
/// ```
pub struct ThreadLocalTargetSource<T> {
    id: u64,
    prototype: PrototypeTargetSource<T>,
    targets: Mutex<Vec<Arc<T>>>,
    invocation_count: AtomicU64,
    hit_count: AtomicU64,
}

impl<T> ThreadLocalTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Attaches to `factory`, refusing singleton-scoped components.
    pub fn attach(spec: TargetSpec<T>, factory: Arc<dyn ComponentFactory>) -> DiResult<Self> {
        Ok(Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            prototype: PrototypeTargetSource::attach_as(spec, factory, KIND)?,
            targets: Mutex::new(Vec::new()),
            invocation_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
        })
    }

    fn cached(&self) -> Option<Arc<T>> {
        THREAD_TARGETS
            .try_with(|slots| {
                slots
                    .borrow()
                    .get(&self.id)
                    .and_then(|slot| slot.as_any().downcast_ref::<Weak<T>>())
                    .and_then(Weak::upgrade)
            })
            .ok()
            .flatten()
    }

    fn bind_to_thread(&self, target: &Arc<T>) {
        let _ = THREAD_TARGETS.try_with(|slots| {
            let mut slots = slots.borrow_mut();
            slots.retain(|_, slot| slot.is_live());
            slots.insert(self.id, Box::new(Arc::downgrade(target)));
        });
    }
}

impl<T> ThreadLocalTargetSource<T> {
    fn unbind_from_thread(&self) {
        let _ = THREAD_TARGETS.try_with(|slots| slots.borrow_mut().remove(&self.id));
    }

    /// Total number of `get_target` calls.
    pub fn invocation_count(&self) -> u64 {
        self.invocation_count.load(Ordering::Relaxed)
    }

    /// Calls answered from a thread's cached target.
    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    /// Distinct targets currently tracked.
    pub fn object_count(&self) -> usize {
        self.targets.lock().len()
    }

    /// Snapshot of all counters.
    ///
    /// Never reports more hits than invocations.
    pub fn stats(&self) -> ThreadLocalStats {
        // Hits first: each hit's invocation is published before it.
        let hit_count = self.hit_count.load(Ordering::Acquire);
        ThreadLocalStats {
            invocation_count: self.invocation_count(),
            hit_count,
            object_count: self.object_count(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.prototype.state()
    }

    /// The factory binding.
    pub fn prototype(&self) -> &PrototypeTargetSource<T> {
        &self.prototype
    }

    /// Destroys every tracked target and stops handing out new ones.
    ///
    /// Destroy hook failures are logged and skipped so the remaining targets
    /// are still destroyed. Calling it again does nothing.
    pub fn dispose(&self) {
        if !self.prototype.lifecycle().dispose() {
            return;
        }

        let mut targets = self.targets.lock();
        tracing::debug!(
            component = self.prototype.base().target_name(),
            count = targets.len(),
            "destroying thread-bound targets"
        );
        let failures = destroy_all(
            self.prototype.base().target_name(),
            self.prototype.base().destroy_hook(),
            targets.drain(..),
        );
        if failures > 0 {
            tracing::warn!(
                component = self.prototype.base().target_name(),
                failures,
                "some thread-bound targets failed to destroy"
            );
        }
        drop(targets);
        self.unbind_from_thread();
    }
}

impl<T> TargetSource for ThreadLocalTargetSource<T>
where
    T: Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(self.prototype.base().target_type())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        self.prototype.lifecycle().enter_use()?;
        self.invocation_count.fetch_add(1, Ordering::Relaxed);

        if let Some(target) = self.cached() {
            self.hit_count.fetch_add(1, Ordering::Release);
            tracing::trace!(component = self.prototype.base().target_name(), "thread-bound target hit");
            return Ok(Some(target));
        }

        tracing::debug!(
            component = self.prototype.base().target_name(),
            thread = ?std::thread::current().id(),
            "no target bound to thread; creating one"
        );
        let target = self.prototype.new_prototype_instance()?;
        {
            let mut targets = self.targets.lock();
            if self.prototype.lifecycle().is_disposed() {
                drop(targets);
                self.prototype.destroy_prototype_instance(&target);
                return Err(DiError::Disposed(KIND));
            }
            targets.push(target.clone());
        }
        self.bind_to_thread(&target);
        Ok(Some(target))
    }
}

impl<T> Drop for ThreadLocalTargetSource<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for ThreadLocalTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocalTargetSource")
            .field("prototype", &self.prototype)
            .field("invocation_count", &self.invocation_count)
            .field("hit_count", &self.hit_count)
            .finish()
    }
}
