/// Manual follow-up tool for provisioning workflows.
///
/// Compensations are best-effort: when one fails, the leftover rows or
/// identities are recorded in workflow_failures and someone runs this.
///
/// Usage: purge-tenant [--tenant UUID] [--list-failures]
use clap::Parser;
use std::sync::Arc;
use uuid::Uuid;

use coachfit_api::config::Config;
use coachfit_api::db;
use coachfit_api::identity::IdentityProvider;
use coachfit_api::services::provisioning::ProvisioningService;

#[derive(Parser)]
#[command(name = "purge-tenant", about = "Tear down a tenant left half-provisioned")]
struct Args {
    /// Tenant id to tear down (identities first, then the tenant row)
    #[arg(long)]
    tenant: Option<Uuid>,

    /// Print recorded compensation failures and exit
    #[arg(long)]
    list_failures: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    if args.list_failures {
        let rows: Vec<(String, String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT workflow, step, detail, created_at
             FROM workflow_failures ORDER BY created_at DESC",
        )
        .fetch_all(&pool)
        .await?;

        if rows.is_empty() {
            tracing::info!("No recorded compensation failures");
        }
        for (workflow, step, detail, created_at) in rows {
            tracing::info!("{created_at}  {workflow}/{step}: {detail}");
        }
        return Ok(());
    }

    let Some(tenant_id) = args.tenant else {
        anyhow::bail!("Pass --tenant UUID or --list-failures");
    };

    let identity = Arc::new(IdentityProvider::new(
        config.identity_url.clone(),
        config.identity_service_key.clone(),
    ));
    let provisioning = ProvisioningService::new(pool, identity);

    tracing::info!("Tearing down tenant {tenant_id}...");
    provisioning.delete_tenant(tenant_id).await?;
    tracing::info!("Tenant {tenant_id} removed");

    Ok(())
}
