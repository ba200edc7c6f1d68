// src/db/field_repo.rs

use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{FieldDefinition, FieldType},
};

#[derive(Clone)]
pub struct FieldRepository {
    pool: PgPool,
}

impl FieldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================

    /// Cria uma nova definição de campo (Ex: "Aniversário", "Segmento")
    pub async fn create_definition(
        &self,
        organization_id: Uuid,
        name: &str,
        key_name: &str,
        field_type: FieldType,
        options: Option<&Value>,
        is_required: bool,
    ) -> Result<FieldDefinition, AppError> {
        sqlx::query_as::<_, FieldDefinition>(
            r#"
            INSERT INTO custom_field_definitions (
                organization_id, name, key_name, field_type, options, is_required, position
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM custom_field_definitions WHERE organization_id = $1)
            )
            RETURNING id, organization_id, name, key_name, field_type, options, is_required, position, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(key_name)
        .bind(field_type)
        .bind(options)
        .bind(is_required)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Tratamento de erro de chave duplicada
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!("A chave '{key_name}' já existe."));
                }
            }
            e.into()
        })
    }

    /// Lista todas as definições para montar o formulário no cliente
    pub async fn list_definitions<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let fields = sqlx::query_as::<_, FieldDefinition>(
            r#"
            SELECT id, organization_id, name, key_name, field_type, options, is_required, position, created_at
            FROM custom_field_definitions
            WHERE organization_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(fields)
    }

    // =========================================================================
    //  VALORES (O Dado)
    // =========================================================================

    pub async fn upsert_value<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        field_id: Uuid,
        value: &Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO customer_field_values (customer_id, field_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_id, field_id) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(customer_id)
        .bind(field_id)
        .bind(value)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_value<'e, E>(&self, executor: E, customer_id: Uuid, field_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM customer_field_values WHERE customer_id = $1 AND field_id = $2")
            .bind(customer_id)
            .bind(field_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
