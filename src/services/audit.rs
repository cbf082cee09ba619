use sqlx::PgPool;

/// Fire-and-forget record of a compensation step that itself failed during
/// a workflow unwind. Spawns a background task — never blocks the handler,
/// never propagates errors (logs a warning on failure). These rows are the
/// input for manual follow-up (see the purge-tenant binary).
pub fn record_compensation_failure(pool: PgPool, workflow: &str, step: &str, detail: &str) {
    let workflow = workflow.to_string();
    let step = step.to_string();
    let detail = detail.to_string();

    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO workflow_failures (workflow, step, detail)
             VALUES ($1, $2, $3)",
        )
        .bind(&workflow)
        .bind(&step)
        .bind(&detail)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("workflow_failures insert failed for {workflow}/{step}: {e}");
        }
    });
}
