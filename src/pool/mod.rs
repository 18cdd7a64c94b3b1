//! Object pool engine contract and the bundled bounded pool.
//!
//! A [`PoolingTargetSource`](crate::PoolingTargetSource) delegates all
//! borrowing, returning and synchronization to a [`PoolEngine`]. The target
//! source supplies the lifecycle hooks ([`PooledObjectFactory`]); the engine
//! decides when to call them.

mod bounded;

use std::sync::Arc;

use crate::config::PoolConfig;
use crate::error::DiResult;

pub use bounded::{BoundedPool, BoundedPoolBuilder, PoolStats};

/// Lifecycle hooks an engine calls on the objects it manages.
pub trait PooledObjectFactory<T>: Send + Sync {
    /// Creates a new object for the pool.
    fn create(&self) -> DiResult<Arc<T>>;

    /// Destroys an object leaving the pool. Must not fail.
    fn destroy(&self, instance: Arc<T>);

    /// Whether an object is still fit to be lent out.
    fn validate(&self, _instance: &T) -> bool {
        true
    }

    /// Prepares an idle object before it is lent out.
    fn activate(&self, _instance: &T) -> DiResult<()> {
        Ok(())
    }

    /// Resets an object as it goes back to idle.
    fn passivate(&self, _instance: &T) -> DiResult<()> {
        Ok(())
    }
}

/// A pool of reusable objects.
///
/// Whether [`borrow_object`](PoolEngine::borrow_object) blocks or fails when
/// the pool is exhausted is the engine's own policy and must be documented
/// by the implementation.
pub trait PoolEngine<T>: Send + Sync {
    /// Lends an object, creating one if the pool allows.
    fn borrow_object(&self) -> DiResult<Arc<T>>;

    /// Takes back an object obtained from `borrow_object`.
    fn return_object(&self, instance: Arc<T>) -> DiResult<()>;

    /// Objects currently lent out.
    fn active_count(&self) -> usize;

    /// Objects waiting in the pool.
    fn idle_count(&self) -> usize;

    /// Destroys idle objects and refuses further borrows.
    fn close(&self);
}

/// Builds the engine for a pooling target source when it attaches.
///
/// Closures with the matching signature implement it, which keeps test
/// doubles short.
pub trait PoolEngineBuilder<T>: Send + Sync {
    fn build_pool(
        &self,
        config: &PoolConfig,
        objects: Arc<dyn PooledObjectFactory<T>>,
    ) -> DiResult<Box<dyn PoolEngine<T>>>;
}

impl<T, F> PoolEngineBuilder<T> for F
where
    F: Fn(&PoolConfig, Arc<dyn PooledObjectFactory<T>>) -> DiResult<Box<dyn PoolEngine<T>>> + Send + Sync,
{
    fn build_pool(
        &self,
        config: &PoolConfig,
        objects: Arc<dyn PooledObjectFactory<T>>,
    ) -> DiResult<Box<dyn PoolEngine<T>>> {
        self(config, objects)
    }
}
