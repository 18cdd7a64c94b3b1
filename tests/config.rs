use ferrous_targets::{
    ConfigProvider, ConfigValue, DiError, EnvironmentConfigSource, MemoryConfigSource, PoolConfig,
    RefreshConfig,
};
use serial_test::serial;
use std::env;
use std::time::Duration;

#[test]
#[serial]
fn test_pool_config_from_environment() {
    env::set_var("TARGETS_POOL_MAX_SIZE", "12");
    env::set_var("TARGETS_POOL_MAX_WAIT_MS", "150");
    env::set_var("TARGETS_POOL_LIFO", "false");

    let mut provider = ConfigProvider::new();
    provider.add_source(Box::new(EnvironmentConfigSource::with_prefix("TARGETS")));
    let config = PoolConfig::load(&provider, "pool").unwrap();

    assert_eq!(config.max_size, 12);
    assert_eq!(config.max_idle, 12);
    assert_eq!(config.max_wait, Some(Duration::from_millis(150)));
    assert!(!config.lifo);

    env::remove_var("TARGETS_POOL_MAX_SIZE");
    env::remove_var("TARGETS_POOL_MAX_WAIT_MS");
    env::remove_var("TARGETS_POOL_LIFO");
}

#[test]
#[serial]
fn test_invalid_environment_value_is_reported() {
    env::set_var("TARGETS_POOL_MAX_SIZE", "lots");

    let mut provider = ConfigProvider::new();
    provider.add_source(Box::new(EnvironmentConfigSource::with_prefix("TARGETS")));
    let result = PoolConfig::load(&provider, "pool");
    assert!(matches!(result, Err(DiError::InvalidConfig(_))));

    env::remove_var("TARGETS_POOL_MAX_SIZE");
}

#[test]
#[serial]
fn test_refresh_config_from_environment() {
    env::set_var("TARGETS_RATES_REFRESH_CHECK_DELAY_MS", "5000");

    let mut provider = ConfigProvider::new();
    provider.add_source(Box::new(EnvironmentConfigSource::with_prefix("TARGETS")));
    let config = RefreshConfig::load(&provider, "rates").unwrap();
    assert_eq!(config, RefreshConfig::every(Duration::from_secs(5)));

    env::remove_var("TARGETS_RATES_REFRESH_CHECK_DELAY_MS");
}

#[test]
fn test_memory_source_validation_errors() {
    let mut provider = ConfigProvider::new();
    provider.add_source(Box::new(
        MemoryConfigSource::new()
            .with("pool.max_size", ConfigValue::Integer(2))
            .with("pool.max_idle", ConfigValue::Integer(5)),
    ));

    assert!(matches!(
        PoolConfig::load(&provider, "pool"),
        Err(DiError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_keys_keep_defaults() {
    let provider = {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(MemoryConfigSource::new()));
        provider
    };

    assert_eq!(PoolConfig::load(&provider, "pool").unwrap(), PoolConfig::default());
    assert_eq!(RefreshConfig::load(&provider, "rates").unwrap(), RefreshConfig::default());
}
