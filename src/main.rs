use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coachfit_api::{
    config::Config,
    db,
    identity::IdentityProvider,
    middleware::auth::JwtSecret,
    routes,
    services::metrics,
    services::notifications::NotificationService,
    services::provisioning::ProvisioningService,
    services::subscriptions::SubscriptionService,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::schema::bootstrap(&pool).await?;
    info!("Database connected and schema bootstrapped");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let identity = Arc::new(IdentityProvider::new(
        config.identity_url.clone(),
        config.identity_service_key.clone(),
    ));

    let state = AppState {
        db: pool.clone(),
        redis: redis_conn,
        redis_client: redis_client.clone(),
        config: config.clone(),
        provisioning: ProvisioningService::new(pool.clone(), identity),
        subscriptions: SubscriptionService::new(pool.clone()),
        notifications: Arc::new(NotificationService::new(config.expo_push_url.clone())),
    };

    metrics::start(pool);

    // The dashboard and the athlete app live on tenant subdomains that are
    // not enumerable up front, so CORS stays permissive and authorization
    // is carried entirely by bearer tokens and hook secrets.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Admin provisioning
        .route("/admin/tenants", post(routes::tenants::create_tenant).get(routes::tenants::list_tenants))
        .route("/admin/tenants/{id}", delete(routes::tenants::delete_tenant))
        .route("/admin/tenants/{id}/subscription", put(routes::tenants::manage_subscription))
        .route("/admin/users/{id}", delete(routes::athletes::delete_user))
        .route("/admin/users/{id}/password", post(routes::athletes::reset_password))
        // Coach-facing
        .route("/athletes", post(routes::athletes::create_athlete))
        .route("/invitations", post(routes::onboarding::create_invitation))
        .route("/onboarding/cref", post(routes::onboarding::complete_onboarding))
        // Athlete app
        .route("/gate/decision", get(routes::gate::decision))
        .route("/app/metrics", post(routes::athletes::body_metrics))
        .route("/push-tokens", post(routes::notifications::register_push_token))
        .route("/onboarding/invitations/{token}", get(routes::onboarding::validate_invitation))
        .route("/onboarding/invitations/{token}/accept", post(routes::onboarding::accept_invitation))
        // Hooks
        .route("/webhooks/asaas", post(routes::webhooks::asaas_webhook))
        .route("/notifications/chat", post(routes::notifications::chat_notification))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("coachfit API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
