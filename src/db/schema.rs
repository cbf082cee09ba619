use sqlx::PgPool;

/// Create all public tables (idempotent — safe to call on every startup).
///
/// Statuses and roles are TEXT with CHECK constraints rather than PG enums,
/// so adding a value never needs an ALTER TYPE.
pub async fn bootstrap(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#)
        .execute(pool)
        .await?;

    // --- Tenants ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS tenants (
            id                  UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            name                VARCHAR(255) NOT NULL,
            slug                VARCHAR(64) UNIQUE NOT NULL,
            plan                TEXT NOT NULL DEFAULT 'starter',
            subscription_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (subscription_status IN
                    ('active','trialing','pending','past_due','canceled')),
            overdue_since       TIMESTAMPTZ,
            created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    // --- Profiles ---
    // id is the identity-provider user id. Email is unique: it doubles as
    // the username-taken probe for provisioning.
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS profiles (
            id         UUID PRIMARY KEY,
            full_name  VARCHAR(255) NOT NULL,
            email      VARCHAR(255) UNIQUE NOT NULL,
            role       TEXT NOT NULL DEFAULT 'client'
                CHECK (role IN ('admin','coach','client')),
            tenant_id  UUID REFERENCES tenants(id) ON DELETE CASCADE,
            cref       VARCHAR(32),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    // --- Clients (athletes) ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS clients (
            id         UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            user_id    UUID NOT NULL,
            tenant_id  UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            full_name  VARCHAR(255) NOT NULL,
            email      VARCHAR(255) NOT NULL,
            status     TEXT NOT NULL DEFAULT 'active',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    // --- Subscriptions (one per tenant) ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS subscriptions (
            id                       UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            tenant_id                UUID UNIQUE NOT NULL
                REFERENCES tenants(id) ON DELETE CASCADE,
            plan_id                  TEXT NOT NULL DEFAULT 'starter',
            status                   TEXT NOT NULL DEFAULT 'pending',
            billing_type             TEXT NOT NULL DEFAULT 'pix',
            provider_subscription_id TEXT,
            current_period_end       TIMESTAMPTZ,
            created_at               TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at               TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"CREATE INDEX IF NOT EXISTS subscriptions_provider_id_idx
           ON subscriptions (provider_subscription_id)"#,
    )
    .execute(pool)
    .await?;

    // --- Invitations ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS invitations (
            id         UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            token      TEXT UNIQUE NOT NULL,
            tenant_id  UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            email      VARCHAR(255) NOT NULL,
            role       TEXT NOT NULL DEFAULT 'client',
            status     TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending','accepted','revoked')),
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    // --- Push tokens ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS push_tokens (
            id         UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            user_id    UUID NOT NULL,
            tenant_id  UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            platform   VARCHAR(16) NOT NULL DEFAULT 'expo',
            token      TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, token)
        )"#,
    )
    .execute(pool)
    .await?;

    // --- Workflow failures ---
    // Compensation steps that themselves failed during a saga unwind land
    // here for manual follow-up (see services::saga).
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS workflow_failures (
            id         UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
            workflow   TEXT NOT NULL,
            step       TEXT NOT NULL,
            detail     TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
