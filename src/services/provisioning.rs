use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    identity::{IdentityProvider, NewIdentity},
    models::profile::Role,
    services::saga::Saga,
};

/// Managed domain for coach credentials. Logins are username-based; the
/// phantom address only exists at the identity provider.
const COACH_EMAIL_DOMAIN: &str = "coach.coachfit.app";
/// Managed domain for athlete credentials created by a coach.
const ATHLETE_EMAIL_DOMAIN: &str = "atleta.coachfit.app";

const RESERVED_USERNAMES: &[&str] = &[
    "www", "api", "app", "admin", "coach", "dashboard", "billing", "suporte",
    "login", "signup", "status",
];

pub fn phantom_email(username: &str, domain: &str) -> String {
    format!("{}@{}", username.to_lowercase(), domain)
}

/// Usernames double as tenant subdomain slugs, so the same rules apply:
/// 3-32 chars, lowercase letters, digits and hyphens, no leading or
/// trailing hyphen.
pub fn is_valid_username(s: &str) -> bool {
    let len = s.len();
    len >= 3
        && len <= 32
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

pub struct CreateTenantInput {
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub business_name: String,
}

pub struct CreateManagedUserInput {
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub tenant_id: Uuid,
    pub role: Role,
}

/// Multi-step workflows that create or destroy paired records across the
/// identity provider and the relational store. Forward steps run strictly
/// in order; partial failures are compensated through the saga runner.
#[derive(Clone)]
pub struct ProvisioningService {
    pool: PgPool,
    identity: Arc<IdentityProvider>,
}

impl ProvisioningService {
    pub fn new(pool: PgPool, identity: Arc<IdentityProvider>) -> Self {
        Self { pool, identity }
    }

    /// Create a tenant and its owning coach.
    ///
    /// Order matters: tenant row, then identity, then profile. The profile
    /// insert is the step the store's uniqueness constraint actually
    /// protects; the earlier probe is only a fast path.
    pub async fn create_tenant(&self, input: CreateTenantInput) -> Result<(Uuid, Uuid), AppError> {
        let username = input.username.trim().to_lowercase();
        validate_required(&[
            (input.full_name.as_str(), "fullName"),
            (username.as_str(), "username"),
            (input.password.as_str(), "password"),
            (input.business_name.as_str(), "businessName"),
        ])?;
        validate_username(&username)?;

        let email = phantom_email(&username, COACH_EMAIL_DOMAIN);
        self.probe_username(&email).await?;

        let mut saga = Saga::with_failure_log("create_tenant", self.pool.clone());

        let tenant_id: Uuid = saga
            .step(
                "tenant row",
                async {
                    sqlx::query_scalar::<_, Uuid>(
                        "INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING id",
                    )
                    .bind(input.business_name.trim())
                    .bind(&username)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| AppError::from_insert(e, "Este nome de usuário já está em uso."))
                },
                |id| {
                    let pool = self.pool.clone();
                    let id = *id;
                    async move {
                        sqlx::query("DELETE FROM tenants WHERE id = $1")
                            .bind(id)
                            .execute(&pool)
                            .await
                            .map(|_| ())
                            .map_err(anyhow::Error::from)
                    }
                },
            )
            .await?;

        let identity = saga
            .step(
                "identity account",
                async {
                    self.identity
                        .create_user(NewIdentity {
                            email: &email,
                            password: &input.password,
                            email_confirm: true,
                            metadata: json!({
                                "full_name": input.full_name.trim(),
                                "role": Role::Coach,
                                "tenant_id": tenant_id,
                            }),
                        })
                        .await
                        .map_err(|e| AppError::dependency(e.to_string()))
                },
                |created| {
                    let idp = self.identity.clone();
                    let id = created.id;
                    async move {
                        idp.delete_user(id).await.map_err(anyhow::Error::from)
                    }
                },
            )
            .await?;

        saga.run("coach profile", async {
            sqlx::query(
                "INSERT INTO profiles (id, full_name, email, role, tenant_id)
                 VALUES ($1, $2, $3, 'coach', $4)",
            )
            .bind(identity.id)
            .bind(input.full_name.trim())
            .bind(&email)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_insert(e, "Este nome de usuário já está em uso."))
        })
        .await?;

        saga.commit();
        tracing::info!("tenant {tenant_id} provisioned for coach {}", identity.id);
        Ok((identity.id, tenant_id))
    }

    /// Create a managed user (athlete by default) under an existing tenant.
    pub async fn create_managed_user(
        &self,
        input: CreateManagedUserInput,
    ) -> Result<Uuid, AppError> {
        let username = input.username.trim().to_lowercase();
        validate_required(&[
            (input.full_name.as_str(), "fullName"),
            (username.as_str(), "username"),
            (input.password.as_str(), "password"),
        ])?;
        validate_username(&username)?;

        let email = phantom_email(&username, ATHLETE_EMAIL_DOMAIN);
        self.probe_username(&email).await?;

        let mut saga = Saga::with_failure_log("create_managed_user", self.pool.clone());

        let identity = saga
            .step(
                "identity account",
                async {
                    self.identity
                        .create_user(NewIdentity {
                            email: &email,
                            password: &input.password,
                            email_confirm: true,
                            metadata: json!({
                                "full_name": input.full_name.trim(),
                                "role": input.role,
                                "tenant_id": input.tenant_id,
                                "managed": true,
                            }),
                        })
                        .await
                        .map_err(|e| AppError::dependency(e.to_string()))
                },
                |created| {
                    let idp = self.identity.clone();
                    let id = created.id;
                    async move {
                        idp.delete_user(id).await.map_err(anyhow::Error::from)
                    }
                },
            )
            .await?;

        saga.step(
            "profile row",
            async {
                sqlx::query(
                    "INSERT INTO profiles (id, full_name, email, role, tenant_id)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(identity.id)
                .bind(input.full_name.trim())
                .bind(&email)
                .bind(input.role.to_string())
                .bind(input.tenant_id)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::from_insert(e, "Este nome de usuário já está em uso."))
            },
            |_| {
                let pool = self.pool.clone();
                let id = identity.id;
                async move {
                    sqlx::query("DELETE FROM profiles WHERE id = $1")
                        .bind(id)
                        .execute(&pool)
                        .await
                        .map(|_| ())
                        .map_err(anyhow::Error::from)
                }
            },
        )
        .await?;

        if input.role == Role::Client {
            saga.run("client row", async {
                sqlx::query(
                    "INSERT INTO clients (user_id, tenant_id, full_name, email)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(identity.id)
                .bind(input.tenant_id)
                .bind(input.full_name.trim())
                .bind(&email)
                .execute(&self.pool)
                .await
                .map_err(AppError::Database)
            })
            .await?;
        }

        saga.commit();
        tracing::info!("managed user {} created in tenant {}", identity.id, input.tenant_id);
        Ok(identity.id)
    }

    /// Tear down a tenant: delete every member identity (warn-and-continue),
    /// then the tenant row. The store cascades the dependent profile, client,
    /// subscription and invitation rows.
    pub async fn delete_tenant(&self, tenant_id: Uuid) -> Result<(), AppError> {
        let member_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await?;

        for user_id in &member_ids {
            if let Err(e) = self.identity.delete_user(*user_id).await {
                // Partial success is accepted: an orphaned identity is less
                // harmful than a tenant stuck half-deleted.
                tracing::warn!("tenant {tenant_id} teardown: identity {user_id} not deleted: {e}");
            }
        }

        let deleted = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Tenant não encontrado".into()));
        }

        tracing::info!(
            "tenant {tenant_id} deleted ({} member identities)",
            member_ids.len()
        );
        Ok(())
    }

    /// Tear down a single user. Strict order: dependent rows before the
    /// identity they reference. One-directional — a failure mid-sequence
    /// leaves earlier deletions in place.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Err(e) = sqlx::query("DELETE FROM clients WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            tracing::warn!("user {user_id} teardown: client rows not deleted: {e}");
        }

        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.identity
            .delete_user(user_id)
            .await
            .map_err(|e| AppError::dependency(e.to_string()))?;

        tracing::info!("user {user_id} deleted");
        Ok(())
    }

    pub async fn reset_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AppError> {
        if new_password.len() < 6 {
            return Err(AppError::validation(
                "A senha deve ter pelo menos 6 caracteres.",
            ));
        }

        self.identity
            .update_password(user_id, new_password)
            .await
            .map_err(|e| AppError::dependency(e.to_string()))
    }

    /// Fast-path duplicate check. The race window between this probe and
    /// the insert is closed by the unique constraint on profiles.email.
    async fn probe_username(&self, email: &str) -> Result<(), AppError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        if taken {
            return Err(AppError::conflict("Este nome de usuário já está em uso."));
        }
        Ok(())
    }
}

fn validate_required(fields: &[(&str, &str)]) -> Result<(), AppError> {
    for (value, name) in fields {
        if value.trim().is_empty() {
            return Err(AppError::validation(format!("Campo obrigatório: {name}")));
        }
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if !is_valid_username(username) {
        return Err(AppError::validation(
            "O nome de usuário deve ter entre 3 e 32 caracteres (letras minúsculas, números, hífens).",
        ));
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Err(AppError::validation("Este nome de usuário é reservado."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phantom_email_lowercases_the_username() {
        assert_eq!(
            phantom_email("JoaoSilva", COACH_EMAIL_DOMAIN),
            "joaosilva@coach.coachfit.app"
        );
        assert_eq!(
            phantom_email("maria-23", ATHLETE_EMAIL_DOMAIN),
            "maria-23@atleta.coachfit.app"
        );
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("joao-silva"));
        assert!(is_valid_username("abc"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("-joao"));
        assert!(!is_valid_username("joao-"));
        assert!(!is_valid_username("João"));
        assert!(!is_valid_username("joao silva"));
    }

    #[test]
    fn reserved_usernames_are_rejected() {
        assert!(validate_username("admin").is_err());
        assert!(validate_username("joao").is_ok());
    }
}
