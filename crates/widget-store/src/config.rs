use serde::{Deserialize, Serialize};
use widget_types::RetentionTable;

/// Redis connection settings. `REDIS_ADDRESSES` with two or more
/// comma-separated endpoints switches the gateway into cluster mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub addresses: Vec<String>,
    pub password: Option<String>,
    pub cluster_mode: bool,
    pub connection_timeout_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["redis://127.0.0.1:6379".to_string()],
            password: None,
            cluster_mode: false,
            connection_timeout_ms: 5_000,
            command_timeout_ms: 5_000,
        }
    }
}

/// Rate limiter admission bounds, shared between the per-IP and global
/// fixed windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub ip_per_minute: u64,
    pub global_per_minute: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_per_minute: 120,
            global_per_minute: 10_000,
        }
    }
}

/// Caps applied by the repositories regardless of plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RepositoryLimits {
    pub max_widgets_per_owner: u64,
    pub max_submissions_per_widget: u64,
    pub max_page_size: u32,
}

impl Default for RepositoryLimits {
    fn default() -> Self {
        Self {
            max_widgets_per_owner: 10_000,
            max_submissions_per_widget: 10_000,
            max_page_size: 1_000,
        }
    }
}

/// Top-level storage layer configuration, assembled from environment
/// variables by [`StoreConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
    pub retention: RetentionTable,
    pub limits: RepositoryLimits,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(addrs) = std::env::var("REDIS_ADDRESSES") {
            let addrs: Vec<String> = addrs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !addrs.is_empty() {
                config.redis.cluster_mode = addrs.len() >= 2;
                config.redis.addresses = addrs;
            }
        }

        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            if !password.is_empty() {
                config.redis.password = Some(password);
            }
        }

        if let Ok(v) = std::env::var("RATE_LIMIT_IP_PER_MIN") {
            config.rate_limit.ip_per_minute = v
                .parse()
                .map_err(|_| "RATE_LIMIT_IP_PER_MIN must be an integer".to_string())?;
        }
        if let Ok(v) = std::env::var("RATE_LIMIT_GLOBAL_PER_MIN") {
            config.rate_limit.global_per_minute = v
                .parse()
                .map_err(|_| "RATE_LIMIT_GLOBAL_PER_MIN must be an integer".to_string())?;
        }

        let mut free_days = 7u32;
        let mut pro_days = 90u32;
        if let Ok(v) = std::env::var("TTL_FREE_DAYS") {
            free_days = v
                .parse()
                .map_err(|_| "TTL_FREE_DAYS must be an integer".to_string())?;
        }
        if let Ok(v) = std::env::var("TTL_PRO_DAYS") {
            pro_days = v
                .parse()
                .map_err(|_| "TTL_PRO_DAYS must be an integer".to_string())?;
        }
        config.retention = RetentionTable::new(free_days, pro_days);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.redis.addresses.is_empty() {
            return Err("at least one Redis address is required".to_string());
        }
        if self.rate_limit.ip_per_minute == 0 {
            return Err("RATE_LIMIT_IP_PER_MIN must be greater than 0".to_string());
        }
        if self.rate_limit.global_per_minute == 0 {
            return Err("RATE_LIMIT_GLOBAL_PER_MIN must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_redis_addresses_fail_validation() {
        let mut config = StoreConfig::default();
        config.redis.addresses.clear();
        assert!(config.validate().is_err());
    }
}
