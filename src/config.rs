//! Configuration of pools and refresh policies.
//!
//! Values come from layered [`ConfigSource`]s (environment variables,
//! in-memory maps) through a [`ConfigProvider`]. With the `config` feature
//! the typed configurations also (de)serialize with serde and load from JSON.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ConfigValue {
    /// Try to convert to string
    pub fn as_string(&self) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(mismatch("a string", other)),
        }
    }

    /// Try to convert to integer
    pub fn as_i64(&self) -> DiResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(mismatch("an integer", other)),
        }
    }

    /// Try to convert to a non-negative size
    pub fn as_usize(&self) -> DiResult<usize> {
        let value = self.as_i64()?;
        usize::try_from(value).map_err(|_| DiError::InvalidConfig(format!("{} is not a valid size", value)))
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(mismatch("a boolean", other)),
        }
    }

    /// Try to convert to duration from milliseconds
    pub fn as_duration_ms(&self) -> DiResult<Duration> {
        let ms = self.as_i64()?;
        if ms < 0 {
            return Err(DiError::InvalidConfig("duration cannot be negative".to_string()));
        }
        Ok(Duration::from_millis(ms as u64))
    }

    /// Duration in milliseconds where a negative value means "no limit"
    pub fn as_optional_duration_ms(&self) -> DiResult<Option<Duration>> {
        let ms = self.as_i64()?;
        Ok((ms >= 0).then(|| Duration::from_millis(ms as u64)))
    }
}

fn mismatch(expected: &str, found: &ConfigValue) -> DiError {
    DiError::InvalidConfig(format!("expected {}, found {:?}", expected, found))
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
///
/// Keys are upper-cased and dots become underscores, so `pool.max_size`
/// with prefix `APP` reads `APP_POOL_MAX_SIZE`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace('.', "_");
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| {
            // Try to parse as different types
            if let Ok(int_val) = value.parse::<i64>() {
                ConfigValue::Integer(int_val)
            } else if let Ok(float_val) = value.parse::<f64>() {
                ConfigValue::Float(float_val)
            } else if let Ok(bool_val) = value.parse::<bool>() {
                ConfigValue::Boolean(bool_val)
            } else {
                ConfigValue::String(value)
            }
        })
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix).map(|rest| rest.to_lowercase())
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, mostly for wiring code and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style
    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Parses a flat JSON object of scalar values
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let values: HashMap<String, ConfigValue> = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidConfig(format!("invalid JSON configuration: {}", e)))?;
        Ok(Self { values })
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Configuration provider layering several sources
pub struct ConfigProvider {
    /// Configuration sources in priority order
    sources: Vec<Box<dyn ConfigSource>>,
    /// Cached configuration values
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl std::fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("sources", &self.sources)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ConfigProvider {
    /// Create a provider without sources
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) -> &mut Self {
        self.sources.push(source);
        self.cache.write().clear();
        self
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Apply `convert` to the value under `key`, if present
    pub fn get_with<T>(&self, key: &str, convert: impl FnOnce(&ConfigValue) -> DiResult<T>) -> DiResult<Option<T>> {
        self.get(key).as_ref().map(convert).transpose()
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        let mut provider = Self::new();
        provider.add_source(Box::new(EnvironmentConfigSource::new()));
        provider
    }
}

#[cfg(feature = "config")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
        }
    }
}

/// Configuration of a bounded object pool
///
/// Defaults follow the usual generic object pool conventions: at most 8
/// instances, block without timeout when exhausted, LIFO idle order, no
/// validation, no background eviction.
///
/// # Examples
///
/// ```
/// use ferrous_targets::{ConfigProvider, ConfigValue, MemoryConfigSource, PoolConfig};
/// use std::time::Duration;
///
/// let mut provider = ConfigProvider::new();
/// provider.add_source(Box::new(
///     MemoryConfigSource::new()
///         .with("pool.max_size", ConfigValue::Integer(4))
///         .with("pool.max_wait_ms", ConfigValue::Integer(250)),
/// ));
///
/// let config = PoolConfig::load(&provider, "pool").unwrap();
/// assert_eq!(config.max_size, 4);
/// assert_eq!(config.max_wait, Some(Duration::from_millis(250)));
/// assert!(config.block_when_exhausted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct PoolConfig {
    /// Maximum number of instances lent out or being created at once
    pub max_size: usize,
    /// Maximum number of idle instances kept; extra returns are destroyed
    pub max_idle: usize,
    /// Idle instances eviction never goes below
    pub min_idle: usize,
    /// How long a borrow waits when exhausted; `None` waits indefinitely
    #[cfg_attr(feature = "config", serde(rename = "max_wait_ms", with = "millis::option"))]
    pub max_wait: Option<Duration>,
    /// Wait for capacity when exhausted instead of failing immediately
    pub block_when_exhausted: bool,
    /// Hand out the most recently returned idle instance first
    pub lifo: bool,
    /// Validate idle instances before lending them
    pub test_on_borrow: bool,
    /// Validate instances when they are returned
    pub test_on_return: bool,
    /// Idle time after which an instance may be evicted
    #[cfg_attr(feature = "config", serde(rename = "min_evictable_idle_ms", with = "millis"))]
    pub min_evictable_idle: Duration,
    /// Interval of opportunistic eviction runs on borrow; `None` disables them
    #[cfg_attr(
        feature = "config",
        serde(rename = "time_between_eviction_runs_ms", with = "millis::option")
    )]
    pub time_between_eviction_runs: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            max_idle: 8,
            min_idle: 0,
            max_wait: None,
            block_when_exhausted: true,
            lifo: true,
            test_on_borrow: false,
            test_on_return: false,
            min_evictable_idle: Duration::from_secs(60),
            time_between_eviction_runs: None,
        }
    }
}

impl PoolConfig {
    /// Pool of at most `max_size` instances, other settings default.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            max_idle: max_size,
            ..Self::default()
        }
    }

    /// Fail immediately instead of waiting when the pool is exhausted.
    pub fn fail_fast(mut self) -> Self {
        self.block_when_exhausted = false;
        self
    }

    /// Bound how long a borrow waits for capacity.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> DiResult<()> {
        if self.max_size == 0 {
            return Err(DiError::InvalidConfig("max_size must be greater than 0".to_string()));
        }
        if self.max_idle > self.max_size {
            return Err(DiError::InvalidConfig(format!(
                "max_idle ({}) must not exceed max_size ({})",
                self.max_idle, self.max_size
            )));
        }
        if self.min_idle > self.max_idle {
            return Err(DiError::InvalidConfig(format!(
                "min_idle ({}) must not exceed max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        Ok(())
    }

    /// Load from `provider`, reading keys under `prefix` (e.g. `pool.max_size`).
    ///
    /// Missing keys keep their defaults. `max_size` also lowers the default
    /// `max_idle`. Negative `max_wait_ms` or `time_between_eviction_runs_ms`
    /// mean "no limit".
    pub fn load(provider: &ConfigProvider, prefix: &str) -> DiResult<Self> {
        let key = |name: &str| format!("{}.{}", prefix, name);
        let mut config = Self::default();

        if let Some(max_size) = provider.get_with(&key("max_size"), ConfigValue::as_usize)? {
            config.max_size = max_size;
            config.max_idle = max_size;
        }
        if let Some(max_idle) = provider.get_with(&key("max_idle"), ConfigValue::as_usize)? {
            config.max_idle = max_idle;
        }
        if let Some(min_idle) = provider.get_with(&key("min_idle"), ConfigValue::as_usize)? {
            config.min_idle = min_idle;
        }
        if let Some(max_wait) = provider.get_with(&key("max_wait_ms"), ConfigValue::as_optional_duration_ms)? {
            config.max_wait = max_wait;
        }
        if let Some(block) = provider.get_with(&key("block_when_exhausted"), ConfigValue::as_bool)? {
            config.block_when_exhausted = block;
        }
        if let Some(lifo) = provider.get_with(&key("lifo"), ConfigValue::as_bool)? {
            config.lifo = lifo;
        }
        if let Some(test) = provider.get_with(&key("test_on_borrow"), ConfigValue::as_bool)? {
            config.test_on_borrow = test;
        }
        if let Some(test) = provider.get_with(&key("test_on_return"), ConfigValue::as_bool)? {
            config.test_on_return = test;
        }
        if let Some(idle) = provider.get_with(&key("min_evictable_idle_ms"), ConfigValue::as_duration_ms)? {
            config.min_evictable_idle = idle;
        }
        if let Some(runs) =
            provider.get_with(&key("time_between_eviction_runs_ms"), ConfigValue::as_optional_duration_ms)?
        {
            config.time_between_eviction_runs = runs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON; omitted fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidConfig(format!("invalid pool configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration of a [`RefreshableTargetSource`](crate::RefreshableTargetSource)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RefreshConfig {
    /// Minimum time between refresh checks; `None` never checks automatically
    #[cfg_attr(feature = "config", serde(rename = "refresh_check_delay_ms", with = "millis::option"))]
    pub refresh_check_delay: Option<Duration>,
}

impl RefreshConfig {
    /// Check for a fresh target at most once per `delay`.
    pub fn every(delay: Duration) -> Self {
        Self {
            refresh_check_delay: Some(delay),
        }
    }

    /// Load `{prefix}.refresh_check_delay_ms`; negative disables checks.
    pub fn load(provider: &ConfigProvider, prefix: &str) -> DiResult<Self> {
        let key = format!("{}.refresh_check_delay_ms", prefix);
        Ok(Self {
            refresh_check_delay: provider
                .get_with(&key, ConfigValue::as_optional_duration_ms)?
                .flatten(),
        })
    }

    /// Parse from JSON; omitted fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DiError::InvalidConfig(format!("invalid refresh configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with(source: MemoryConfigSource) -> ConfigProvider {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(source));
        provider
    }

    #[test]
    fn test_config_value_conversions() {
        let string_val = ConfigValue::String("hello".to_string());
        let int_val = ConfigValue::Integer(42);
        let bool_val = ConfigValue::Boolean(true);
        let duration_val = ConfigValue::Integer(5000);

        assert_eq!(string_val.as_string().unwrap(), "hello");
        assert_eq!(int_val.as_i64().unwrap(), 42);
        assert!(bool_val.as_bool().unwrap());
        assert_eq!(duration_val.as_duration_ms().unwrap(), Duration::from_secs(5));
        assert_eq!(ConfigValue::Integer(-1).as_optional_duration_ms().unwrap(), None);

        assert!(string_val.as_i64().is_err());
        assert!(int_val.as_string().is_err());
        assert!(ConfigValue::Integer(-3).as_usize().is_err());
    }

    #[test]
    fn test_provider_prefers_earlier_sources() {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(MemoryConfigSource::new().with("a", ConfigValue::Integer(1))));
        provider.add_source(Box::new(
            MemoryConfigSource::new()
                .with("a", ConfigValue::Integer(2))
                .with("b", ConfigValue::Integer(3)),
        ));

        assert_eq!(provider.get("a"), Some(ConfigValue::Integer(1)));
        assert_eq!(provider.get("b"), Some(ConfigValue::Integer(3)));
        assert_eq!(provider.all_keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_pool_config_defaults_when_empty() {
        let config = PoolConfig::load(&ConfigProvider::new(), "pool").unwrap();
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_pool_config_loading() {
        let provider = provider_with(
            MemoryConfigSource::new()
                .with("workers.max_size", ConfigValue::Integer(3))
                .with("workers.max_wait_ms", ConfigValue::Integer(-1))
                .with("workers.block_when_exhausted", ConfigValue::Boolean(false))
                .with("workers.test_on_borrow", ConfigValue::Boolean(true)),
        );

        let config = PoolConfig::load(&provider, "workers").unwrap();

        assert_eq!(config.max_size, 3);
        assert_eq!(config.max_idle, 3);
        assert_eq!(config.max_wait, None);
        assert!(!config.block_when_exhausted);
        assert!(config.test_on_borrow);
    }

    #[test]
    fn test_pool_config_rejects_invalid_values() {
        let zero = provider_with(MemoryConfigSource::new().with("pool.max_size", ConfigValue::Integer(0)));
        assert!(matches!(PoolConfig::load(&zero, "pool"), Err(DiError::InvalidConfig(_))));

        let idle = provider_with(
            MemoryConfigSource::new()
                .with("pool.max_size", ConfigValue::Integer(2))
                .with("pool.max_idle", ConfigValue::Integer(5)),
        );
        assert!(matches!(PoolConfig::load(&idle, "pool"), Err(DiError::InvalidConfig(_))));

        let wrong_type = provider_with(MemoryConfigSource::new().with("pool.lifo", ConfigValue::Integer(1)));
        assert!(PoolConfig::load(&wrong_type, "pool").is_err());
    }

    #[test]
    fn test_refresh_config_loading() {
        let provider = provider_with(
            MemoryConfigSource::new().with("cache.refresh_check_delay_ms", ConfigValue::Integer(1500)),
        );
        let config = RefreshConfig::load(&provider, "cache").unwrap();
        assert_eq!(config.refresh_check_delay, Some(Duration::from_millis(1500)));

        let disabled = RefreshConfig::load(&ConfigProvider::new(), "cache").unwrap();
        assert_eq!(disabled.refresh_check_delay, None);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_pool_config_from_json() {
        let config = PoolConfig::from_json(r#"{ "max_size": 4, "max_idle": 2, "max_wait_ms": 100 }"#).unwrap();
        assert_eq!(config.max_size, 4);
        assert_eq!(config.max_idle, 2);
        assert_eq!(config.max_wait, Some(Duration::from_millis(100)));
        assert!(config.lifo);

        assert!(PoolConfig::from_json(r#"{ "max_size": 0 }"#).is_err());
    }
}
