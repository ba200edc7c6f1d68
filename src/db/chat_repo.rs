// src/db/chat_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::chat::{Channel, Chat, ChatMessage, Team},
};

const CHAT_COLUMNS: &str =
    "id, organization_id, customer_id, channel_id, contact_value, assigned_to, team_id, status, created_at";

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  CANAIS E EQUIPES
    // =========================================================================

    pub async fn list_channels(&self, organization_id: Uuid) -> Result<Vec<Channel>, AppError> {
        let channels = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, organization_id, name, kind, team_id, is_active
            FROM channels
            WHERE organization_id = $1 AND is_active
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(channels)
    }

    pub async fn find_channel<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        channel_id: Uuid,
    ) -> Result<Option<Channel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let channel = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, organization_id, name, kind, team_id, is_active
            FROM channels
            WHERE organization_id = $1 AND id = $2 AND is_active
            "#,
        )
        .bind(organization_id)
        .bind(channel_id)
        .fetch_optional(executor)
        .await?;
        Ok(channel)
    }

    pub async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<Team>, AppError> {
        let teams = sqlx::query_as::<_, Team>("SELECT id, organization_id, name FROM teams WHERE organization_id = $1 ORDER BY name")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }

    // =========================================================================
    //  CONVERSAS
    // =========================================================================

    /// Conversa aberta para o par (canal, contato), se existir.
    pub async fn find_open_chat<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        channel_id: Uuid,
        contact_value: &str,
    ) -> Result<Option<Chat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE organization_id = $1 AND channel_id = $2 AND contact_value = $3 AND status = 'open'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(organization_id)
        .bind(channel_id)
        .bind(contact_value)
        .fetch_optional(executor)
        .await?;
        Ok(chat)
    }

    pub async fn find_chat<'e, E>(&self, executor: E, organization_id: Uuid, chat_id: Uuid) -> Result<Option<Chat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE organization_id = $1 AND id = $2"
        ))
        .bind(organization_id)
        .bind(chat_id)
        .fetch_optional(executor)
        .await?;
        Ok(chat)
    }

    /// Abre a conversa; `None` quando outra transação já abriu uma para o mesmo contato e canal.
    pub async fn insert_open_chat<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
        channel: &Channel,
        contact_value: &str,
        assigned_to: Uuid,
    ) -> Result<Option<Chat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            r#"
            INSERT INTO chats (organization_id, customer_id, channel_id, contact_value, assigned_to, team_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (organization_id, channel_id, contact_value) WHERE status = 'open' DO NOTHING
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(organization_id)
        .bind(customer_id)
        .bind(channel.id)
        .bind(contact_value)
        .bind(assigned_to)
        .bind(channel.team_id)
        .fetch_optional(executor)
        .await?;
        Ok(chat)
    }

    /// As últimas `limit` mensagens, em ordem cronológica.
    pub async fn recent_messages(&self, chat_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>, AppError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, chat_id, direction, body, created_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    const SCHEMA: &str = include_str!("../../migrations/20250301120000_initial_schema.sql");

    #[test]
    fn open_chats_are_unique_per_channel_and_contact() {
        // Alvo do ON CONFLICT em `insert_open_chat`
        assert!(SCHEMA.contains(
            "CREATE UNIQUE INDEX idx_chats_one_open ON chats (organization_id, channel_id, contact_value)\n    WHERE status = 'open';"
        ));
    }
}
