use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// HS256 secret shared with the identity provider's token issuer.
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Base URL of the identity provider's admin API.
    pub identity_url: String,
    /// Service key for the identity provider's admin endpoints.
    pub identity_service_key: String,
    /// Shared secret expected in the `asaas-access-token` webhook header.
    pub asaas_webhook_token: String,
    /// Shared secret for internal hooks (chat notification trigger).
    pub internal_hook_key: String,
    /// Expo push endpoint (overridable for staging).
    pub expo_push_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            jwt_secret: required("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            identity_url: required("IDENTITY_URL")?,
            identity_service_key: required("IDENTITY_SERVICE_KEY")?,
            asaas_webhook_token: required("ASAAS_WEBHOOK_TOKEN")?,
            internal_hook_key: required("INTERNAL_HOOK_KEY")?,
            expo_push_url: env::var("EXPO_PUSH_URL")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
