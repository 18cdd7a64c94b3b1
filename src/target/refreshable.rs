//! Target source that periodically replaces its cached target.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;

use crate::config::RefreshConfig;
use crate::descriptors::TypeDescriptor;
use crate::error::DiResult;
use crate::factory::ComponentFactory;
use crate::target::factory_backed::{FactoryBacked, TargetSpec};
use crate::traits::TargetSource;

type FetchFn<T> = Box<dyn Fn() -> DiResult<Arc<T>> + Send + Sync>;
type RequiresRefreshFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct RefreshState<T: ?Sized> {
    target: Option<Arc<T>>,
    last_check: Option<Instant>,
    last_refresh: Option<SystemTime>,
}

/// Caches a target and swaps in a fresh one from time to time.
///
/// On `get_target`, once `refresh_check_delay` has passed since the last
/// check, the `requires_refresh` predicate (always true if unset) decides
/// whether to fetch a new target. Without a delay the target is only
/// replaced by an explicit [`refresh`](RefreshableTargetSource::refresh).
/// The first call always fetches. Targets already handed out stay valid.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{RefreshConfig, RefreshableTargetSource, TargetSource};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// static VERSION: AtomicU32 = AtomicU32::new(1);
///
/// let source = RefreshableTargetSource::new("rates", RefreshConfig::default(), || {
///     Ok(Arc::new(VERSION.load(Ordering::SeqCst)))
/// });
/// assert_eq!(*source.get_target().unwrap().unwrap(), 1);
///
/// VERSION.store(2, Ordering::SeqCst);
/// assert_eq!(*source.get_target().unwrap().unwrap(), 1);
///
/// source.refresh().unwrap();
/// assert_eq!(*source.get_target().unwrap().unwrap(), 2);
/// assert_eq!(source.refresh_count(), 2);
/// ```
pub struct RefreshableTargetSource<T: ?Sized> {
    name: String,
    fetch: FetchFn<T>,
    requires_refresh: Option<RequiresRefreshFn<T>>,
    config: RefreshConfig,
    state: Mutex<RefreshState<T>>,
    refresh_count: AtomicU64,
}

impl<T> RefreshableTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Creates a source named `name` (used in logs) that fetches with `fetch`.
    pub fn new<F>(name: impl Into<String>, config: RefreshConfig, fetch: F) -> Self
    where
        F: Fn() -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fetch: Box::new(fetch),
            requires_refresh: None,
            config,
            state: Mutex::new(RefreshState {
                target: None,
                last_check: None,
                last_refresh: None,
            }),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Only refresh when `predicate` says the current target is stale.
    pub fn with_requires_refresh<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.requires_refresh = Some(Box::new(predicate));
        self
    }

    /// Fetches a fresh target now, replacing the cached one.
    pub fn refresh(&self) -> DiResult<Arc<T>> {
        let mut state = self.state.lock();
        self.refresh_locked(&mut state)
    }

    fn refresh_locked(&self, state: &mut RefreshState<T>) -> DiResult<Arc<T>> {
        tracing::debug!(component = %self.name, "refreshing target");
        let fresh = (self.fetch)()?;
        state.target = Some(fresh.clone());
        state.last_check = Some(Instant::now());
        state.last_refresh = Some(SystemTime::now());
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        Ok(fresh)
    }

    fn check_delay_elapsed(&self, state: &mut RefreshState<T>) -> bool {
        let Some(delay) = self.config.refresh_check_delay else {
            return false;
        };
        let now = Instant::now();
        match state.last_check {
            Some(last) if now.duration_since(last) < delay => false,
            _ => {
                state.last_check = Some(now);
                true
            }
        }
    }
}

impl<T> RefreshableTargetSource<T>
where
    T: Send + Sync + 'static,
{
    /// Refreshes from a named factory component.
    ///
    /// The component should be prototype-scoped: a singleton comes back
    /// identical, so refreshing would never change the target.
    pub fn from_factory(
        spec: TargetSpec<T>,
        config: RefreshConfig,
        factory: Arc<dyn ComponentFactory>,
    ) -> DiResult<Self> {
        let base = FactoryBacked::attach(spec, factory)?;
        let name = base.target_name().to_string();
        Ok(Self::new(name, config, move || base.new_instance()))
    }
}

impl<T: ?Sized> RefreshableTargetSource<T> {
    /// Number of fetches so far, the initial one included.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    /// Wall-clock time of the last fetch.
    pub fn last_refresh(&self) -> Option<SystemTime> {
        self.state.lock().last_refresh
    }

    /// The refresh configuration.
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }
}

impl<T> TargetSource for RefreshableTargetSource<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    type Target = T;

    fn target_type(&self) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::of::<T>())
    }

    fn get_target(&self) -> DiResult<Option<Arc<T>>> {
        let mut state = self.state.lock();
        if let Some(current) = state.target.clone() {
            let stale = self.check_delay_elapsed(&mut state)
                && self.requires_refresh.as_ref().map_or(true, |p| p(&current));
            if !stale {
                return Ok(Some(current));
            }
        }
        self.refresh_locked(&mut state).map(Some)
    }
}

impl<T: ?Sized> fmt::Debug for RefreshableTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshableTargetSource")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("refresh_count", &self.refresh_count())
            .finish()
    }
}
