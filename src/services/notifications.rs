use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

/// Data-change record forwarded by the store when a chat message lands.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRecord {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub tenant_id: Uuid,
}

/// Result of a chat push dispatch. A recipient without a registered token
/// is a normal outcome, not an error.
pub enum ChatPushOutcome {
    Sent(Value),
    NoToken,
}

pub struct NotificationService {
    pub client: Client,
    push_url: String,
}

impl NotificationService {
    pub fn new(push_url: String) -> Self {
        Self {
            client: Client::new(),
            push_url,
        }
    }

    /// Forward a chat message to the recipient's registered devices via the
    /// Expo push endpoint. Looks up the recipient's tokens and the sender's
    /// display name, then relays Expo's response to the caller.
    pub async fn notify_chat_message(
        &self,
        pool: &PgPool,
        record: &ChatMessageRecord,
    ) -> anyhow::Result<ChatPushOutcome> {
        let tokens: Vec<String> = sqlx::query_scalar(
            "SELECT token FROM push_tokens WHERE user_id = $1 AND tenant_id = $2",
        )
        .bind(record.receiver_id)
        .bind(record.tenant_id)
        .fetch_all(pool)
        .await?;

        if tokens.is_empty() {
            tracing::debug!("no push token for user {}", record.receiver_id);
            return Ok(ChatPushOutcome::NoToken);
        }

        let sender_name: Option<String> =
            sqlx::query_scalar("SELECT full_name FROM profiles WHERE id = $1")
                .bind(record.sender_id)
                .fetch_optional(pool)
                .await?;

        let messages: Vec<Value> = tokens
            .iter()
            .map(|token| {
                json!({
                    "to": token,
                    "sound": "default",
                    "title": sender_name.as_deref().unwrap_or("Nova mensagem"),
                    "body": record.content,
                    "data": {
                        "type": "chat",
                        "senderId": record.sender_id,
                    },
                })
            })
            .collect();

        let response = self
            .client
            .post(&self.push_url)
            .header("Content-Type", "application/json")
            .json(&messages)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("push endpoint returned {status}: {text}");
        }

        let expo_data = response.json::<Value>().await?;
        Ok(ChatPushOutcome::Sent(expo_data))
    }

    pub async fn register_push_token(
        pool: &PgPool,
        user_id: Uuid,
        tenant_id: Uuid,
        platform: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO push_tokens (user_id, tenant_id, platform, token)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, token) DO NOTHING",
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(platform)
        .bind(token)
        .execute(pool)
        .await?;
        Ok(())
    }
}
