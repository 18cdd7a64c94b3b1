//! Bounded, blocking object pool.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::{DiError, DiResult};
use crate::pool::{PoolEngine, PoolEngineBuilder, PooledObjectFactory};

/// Counters of a [`BoundedPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Objects created
    pub created: u64,
    /// Objects destroyed (invalid, over `max_idle`, evicted or closed)
    pub destroyed: u64,
    /// Successful borrows
    pub borrowed: u64,
    /// Returns
    pub returned: u64,
}

struct IdleEntry<T> {
    instance: Arc<T>,
    idle_since: Instant,
}

struct PoolState<T> {
    idle: VecDeque<IdleEntry<T>>,
    active: Vec<Arc<T>>,
    /// Creations in flight; they count against `max_size`
    creating: usize,
    closed: bool,
    last_eviction: Instant,
    stats: PoolStats,
}

impl<T> PoolState<T> {
    fn take_active(&mut self, instance: &Arc<T>) -> Option<Arc<T>> {
        let pos = self.active.iter().position(|a| Arc::ptr_eq(a, instance))?;
        Some(self.active.swap_remove(pos))
    }

    fn is_active(&self, instance: &Arc<T>) -> bool {
        self.active.iter().any(|a| Arc::ptr_eq(a, instance))
    }
}

/// Object pool holding at most `max_size` objects.
///
/// Exhaustion policy: when every object is lent out and `max_size` is
/// reached, a borrow waits on a condition variable for a return, up to
/// `max_wait` (`None` waits indefinitely), then fails with
/// [`DiError::PoolExhausted`]. With `block_when_exhausted` off it fails at
/// once. Waiters are not served in FIFO order.
///
/// Idle objects are handed out LIFO by default. Returns beyond `max_idle`
/// and returns to a closed pool destroy the object. There is no background
/// evictor: [`evict_idle`](BoundedPool::evict_idle) runs on demand, and on
/// borrow once `time_between_eviction_runs` has elapsed.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{BoundedPool, DiResult, PoolConfig, PoolEngine, PooledObjectFactory};
/// use std::sync::Arc;
///
/// struct Buffers;
///
/// impl PooledObjectFactory<Vec<u8>> for Buffers {
///     fn create(&self) -> DiResult<Arc<Vec<u8>>> {
///         Ok(Arc::new(Vec::with_capacity(4096)))
///     }
///     fn destroy(&self, _instance: Arc<Vec<u8>>) {}
/// }
///
/// let pool = BoundedPool::<Vec<u8>>::new(PoolConfig::with_max_size(1).fail_fast(), Arc::new(Buffers)).unwrap();
/// let buffer = pool.borrow_object().unwrap();
/// assert!(pool.borrow_object().is_err());
///
/// pool.return_object(buffer.clone()).unwrap();
/// assert!(Arc::ptr_eq(&pool.borrow_object().unwrap(), &buffer));
/// ```
pub struct BoundedPool<T> {
    config: PoolConfig,
    objects: Arc<dyn PooledObjectFactory<T>>,
    state: Mutex<PoolState<T>>,
    available: Condvar,
}

impl<T> BoundedPool<T> {
    /// Creates an empty pool; objects are created on demand.
    pub fn new(config: PoolConfig, objects: Arc<dyn PooledObjectFactory<T>>) -> DiResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            objects,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                active: Vec::new(),
                creating: 0,
                closed: false,
                last_eviction: Instant::now(),
                stats: PoolStats::default(),
            }),
            available: Condvar::new(),
        })
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }

    /// Whether [`close`](PoolEngine::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Destroys idle objects idle for at least `min_evictable_idle`, keeping
    /// `min_idle` of them. Returns how many were destroyed.
    pub fn evict_idle(&self) -> usize {
        let evicted: Vec<Arc<T>> = {
            let mut state = self.state.lock();
            state.last_eviction = Instant::now();
            let mut evicted = Vec::new();
            let mut kept = VecDeque::with_capacity(state.idle.len());
            let mut remaining = state.idle.len();
            while let Some(entry) = state.idle.pop_front() {
                if remaining > self.config.min_idle
                    && entry.idle_since.elapsed() >= self.config.min_evictable_idle
                {
                    evicted.push(entry.instance);
                    remaining -= 1;
                } else {
                    kept.push_back(entry);
                }
            }
            state.idle = kept;
            state.stats.destroyed += evicted.len() as u64;
            evicted
        };

        let count = evicted.len();
        if count > 0 {
            tracing::debug!(count, "evicting idle pooled objects");
        }
        for instance in evicted {
            self.objects.destroy(instance);
        }
        count
    }

    fn maybe_evict(&self) {
        if let Some(interval) = self.config.time_between_eviction_runs {
            let due = self.state.lock().last_eviction.elapsed() >= interval;
            if due {
                self.evict_idle();
            }
        }
    }

    /// Activates (and, with `test_on_borrow`, validates) an object leaving idle.
    fn prepare(&self, instance: &T) -> bool {
        if let Err(error) = self.objects.activate(instance) {
            tracing::debug!(%error, "activation failed; discarding pooled object");
            return false;
        }
        !self.config.test_on_borrow || self.objects.validate(instance)
    }

    /// Removes a lent-out object from the pool for good.
    fn discard(&self, instance: Arc<T>) {
        {
            let mut state = self.state.lock();
            state.take_active(&instance);
            state.stats.destroyed += 1;
        }
        self.available.notify_one();
        self.objects.destroy(instance);
    }

    fn create(&self) -> DiResult<Arc<T>> {
        let slot = CreationSlot { pool: self };
        let created = self.objects.create();
        std::mem::forget(slot);

        let mut state = self.state.lock();
        state.creating -= 1;
        match created {
            Ok(instance) if state.closed => {
                state.stats.created += 1;
                state.stats.destroyed += 1;
                drop(state);
                self.objects.destroy(instance);
                Err(DiError::PoolClosed)
            }
            Ok(instance) => {
                state.active.push(instance.clone());
                state.stats.created += 1;
                state.stats.borrowed += 1;
                drop(state);
                tracing::debug!(max_size = self.config.max_size, "created pooled object");
                if let Err(error) = self.objects.activate(&instance) {
                    self.discard(instance);
                    return Err(error);
                }
                Ok(instance)
            }
            Err(error) => {
                drop(state);
                self.available.notify_one();
                Err(error)
            }
        }
    }
}

/// A reserved creation slot, given back if the constructor unwinds.
struct CreationSlot<'a, T> {
    pool: &'a BoundedPool<T>,
}

impl<T> Drop for CreationSlot<'_, T> {
    fn drop(&mut self) {
        self.pool.state.lock().creating -= 1;
        self.pool.available.notify_one();
        tracing::warn!("pooled object constructor panicked; slot released");
    }
}

impl<T: Send + Sync> PoolEngine<T> for BoundedPool<T> {
    fn borrow_object(&self) -> DiResult<Arc<T>> {
        self.maybe_evict();
        let deadline = self.config.max_wait.map(|wait| Instant::now() + wait);

        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(DiError::PoolClosed);
            }

            let entry = if self.config.lifo {
                state.idle.pop_back()
            } else {
                state.idle.pop_front()
            };
            if let Some(entry) = entry {
                state.active.push(entry.instance.clone());
                state.stats.borrowed += 1;
                drop(state);
                if self.prepare(&entry.instance) {
                    return Ok(entry.instance);
                }
                self.discard(entry.instance);
                state = self.state.lock();
                continue;
            }

            if state.active.len() + state.creating < self.config.max_size {
                state.creating += 1;
                drop(state);
                return self.create();
            }

            if !self.config.block_when_exhausted {
                return Err(DiError::PoolExhausted {
                    max_size: self.config.max_size,
                });
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        tracing::debug!(max_size = self.config.max_size, "timed out waiting for pooled object");
                        return Err(DiError::PoolExhausted {
                            max_size: self.config.max_size,
                        });
                    }
                    self.available.wait_until(&mut state, deadline);
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    fn return_object(&self, instance: Arc<T>) -> DiResult<()> {
        if !self.state.lock().is_active(&instance) {
            return Err(DiError::ForeignInstance);
        }

        let reusable = match self.objects.passivate(&instance) {
            Ok(()) => !self.config.test_on_return || self.objects.validate(&instance),
            Err(error) => {
                tracing::debug!(%error, "passivation failed; discarding pooled object");
                false
            }
        };

        let mut state = self.state.lock();
        let instance = state.take_active(&instance).ok_or(DiError::ForeignInstance)?;
        state.stats.returned += 1;

        if reusable && !state.closed && state.idle.len() < self.config.max_idle {
            state.idle.push_back(IdleEntry {
                instance,
                idle_since: Instant::now(),
            });
            drop(state);
            self.available.notify_one();
        } else {
            state.stats.destroyed += 1;
            drop(state);
            self.available.notify_one();
            self.objects.destroy(instance);
        }
        Ok(())
    }

    fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    fn close(&self) {
        let idle: Vec<_> = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle: Vec<_> = state.idle.drain(..).map(|entry| entry.instance).collect();
            state.stats.destroyed += idle.len() as u64;
            idle
        };
        self.available.notify_all();

        tracing::debug!(count = idle.len(), "closing pool; destroying idle objects");
        for instance in idle {
            self.objects.destroy(instance);
        }
    }
}

impl<T> fmt::Debug for BoundedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedPool")
            .field("config", &self.config)
            .field("active", &state.active.len())
            .field("idle", &state.idle.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Builds a [`BoundedPool`] for a pooling target source.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedPoolBuilder;

impl<T: Send + Sync + 'static> PoolEngineBuilder<T> for BoundedPoolBuilder {
    fn build_pool(
        &self,
        config: &PoolConfig,
        objects: Arc<dyn PooledObjectFactory<T>>,
    ) -> DiResult<Box<dyn PoolEngine<T>>> {
        Ok(Box::new(BoundedPool::new(config.clone(), objects)?))
    }
}
