use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the identity provider's admin API. These fail independently
/// of the relational store, which is why provisioning needs compensation.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A user account as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

pub struct NewIdentity<'a> {
    pub email: &'a str,
    pub password: &'a str,
    /// Phantom addresses cannot receive a confirmation mail, so accounts
    /// are created pre-confirmed.
    pub email_confirm: bool,
    pub metadata: Value,
}

/// HTTP client for the identity provider's admin endpoints, authenticated
/// by the service key.
pub struct IdentityProvider {
    client: Client,
    base_url: String,
    service_key: String,
}

impl IdentityProvider {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    pub async fn create_user(&self, new: NewIdentity<'_>) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .post(format!("{}/admin/users", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": new.email,
                "password": new.password,
                "email_confirm": new.email_confirm,
                "user_metadata": new.metadata,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.json::<Identity>().await?)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let response = self
            .client
            .delete(format!("{}/admin/users/{id}", self.base_url))
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    pub async fn update_password(&self, id: Uuid, new_password: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .put(format!("{}/admin/users/{id}", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&json!({ "password": new_password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    async fn api_error(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let message = match response.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => "unknown error".to_string(),
        };
        IdentityError::Api { status, message }
    }
}
