use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref PROVISIONING_COUNTER: CounterVec = register_counter_vec!(
        "api_provisioning_total",
        "Provisioning workflow runs by workflow and outcome",
        &["workflow", "outcome"]
    ).unwrap();

    pub static ref WEBHOOK_EVENTS_COUNTER: CounterVec = register_counter_vec!(
        "api_webhook_events_total",
        "Payment webhook events received by event type",
        &["event"]
    ).unwrap();

    pub static ref CHAT_PUSH_COUNTER: CounterVec = register_counter_vec!(
        "api_chat_push_total",
        "Chat push dispatches by outcome",
        &["outcome"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref TENANTS_GAUGE: GaugeVec = register_gauge_vec!(
        "coachfit_tenants_total",
        "Tenants by subscription status",
        &["status"]
    ).unwrap();

    pub static ref ATHLETES_GAUGE: Gauge = register_gauge!(
        "coachfit_athletes_active_total",
        "Active athlete records across all tenants"
    ).unwrap();

    pub static ref WORKFLOW_FAILURES_GAUGE: Gauge = register_gauge!(
        "coachfit_workflow_failures_total",
        "Compensation failures awaiting manual follow-up"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        // Initial collection on startup
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let by_status: Vec<(String, i64)> = sqlx::query_as(
        "SELECT subscription_status, COUNT(*)::BIGINT FROM tenants GROUP BY subscription_status",
    )
    .fetch_all(pool)
    .await?;

    let mut total = 0i64;
    for (status, count) in &by_status {
        TENANTS_GAUGE.with_label_values(&[status]).set(*count as f64);
        total += count;
    }

    let athletes: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM clients WHERE status = 'active'")
            .fetch_one(pool)
            .await
            .unwrap_or(0);
    ATHLETES_GAUGE.set(athletes as f64);

    let failures: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM workflow_failures")
        .fetch_one(pool)
        .await
        .unwrap_or(0);
    WORKFLOW_FAILURES_GAUGE.set(failures as f64);

    info!("Metrics: collected for {} tenant(s)", total);
    Ok(())
}
