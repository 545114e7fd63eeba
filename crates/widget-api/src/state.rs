//! Application state shared across all request handlers.
//!
//! One `Clone`-able struct holding `Arc`-wrapped shared resources,
//! constructed once in `main` and threaded through Axum's `with_state`.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use widget_store::{
    RateLimiter, RedisGateway, StatsRepository, SubmissionRepository, TtlManager, WidgetRepository,
};

use crate::config::AppConfig;
use crate::metrics::MetricsRegistry;
use crate::middleware::AuthConfig;
use crate::service::WidgetService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthConfig,
    pub rate_limiter: RateLimiter,
    pub widget_service: Arc<WidgetService>,
    pub metrics: Arc<MetricsRegistry>,
    pub redis_health: Arc<RwLock<HealthStatus>>,
    pub started_at: Instant,
    redis: RedisGateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub up: bool,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self { up: false }
    }
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let gateway = RedisGateway::connect(&config.store.redis).await?;
        let ttl = TtlManager::new(config.store.retention, gateway.clone());

        let widget_repo = WidgetRepository::new(
            gateway.clone(),
            ttl.clone(),
            config.store.limits.max_widgets_per_owner,
        );
        let submission_repo = SubmissionRepository::new(
            gateway.clone(),
            ttl.clone(),
            config.store.limits.max_submissions_per_widget,
        );
        let stats_repo = StatsRepository::new(gateway.clone(), ttl.clone());
        let rate_limiter = RateLimiter::new(
            gateway.clone(),
            config.store.rate_limit.ip_per_minute,
            config.store.rate_limit.global_per_minute,
        );

        let widget_service = Arc::new(WidgetService::new(
            widget_repo,
            submission_repo,
            stats_repo,
            ttl,
            config.store.limits.max_page_size,
        ));

        let auth = AuthConfig::new(&config.jwt_secret);
        let metrics = Arc::new(MetricsRegistry::default());

        let initial_health = gateway.health().await;

        Ok(Self {
            config: Arc::new(config),
            auth,
            rate_limiter,
            widget_service,
            metrics,
            redis_health: Arc::new(RwLock::new(HealthStatus { up: initial_health.up })),
            started_at: Instant::now(),
            redis: gateway,
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn redis_up(&self) -> bool {
        self.redis_health.read().map(|guard| guard.up).unwrap_or(false)
    }

    /// Fresh liveness probe, bypassing the cached [`HealthStatus`] the
    /// connection health monitor maintains. Used by that monitor itself and
    /// by any caller that needs an up-to-the-moment answer.
    pub async fn probe_redis(&self) -> bool {
        self.redis.health().await.up
    }
}
