// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use config::Config;
use services::notifications::NotificationService;
use services::provisioning::ProvisioningService;
use services::subscriptions::SubscriptionService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub redis_client: RedisClient,
    pub config: Arc<Config>,
    pub provisioning: ProvisioningService,
    pub subscriptions: SubscriptionService,
    pub notifications: Arc<NotificationService>,
}
