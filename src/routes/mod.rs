pub mod athletes;
pub mod gate;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod onboarding;
pub mod tenants;
pub mod webhooks;
