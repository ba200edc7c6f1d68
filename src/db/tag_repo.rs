// src/db/tag_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::customer::Tag};

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list_tags(&self, organization_id: Uuid) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, organization_id, name, color, created_at FROM tags WHERE organization_id = $1 ORDER BY name ASC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn create_tag(&self, organization_id: Uuid, name: &str, color: &str) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (organization_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, color, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("tags_org_name_key") {
                    return AppError::UniqueConstraintViolation(format!("tag '{name}'"));
                }
            }
            e.into()
        })
    }

    pub async fn delete_tag(&self, organization_id: Uuid, tag_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Quantas das tags informadas pertencem à organização.
    pub async fn count_in_org<'e, E>(&self, executor: E, organization_id: Uuid, tag_ids: &[Uuid]) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE organization_id = $1 AND id = ANY($2)")
            .bind(organization_id)
            .bind(tag_ids)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn tag_ids_for_customer<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT tag_id FROM customer_tags WHERE customer_id = $1 ORDER BY created_at ASC")
                .bind(customer_id)
                .fetch_all(executor)
                .await?;
        Ok(ids)
    }

    /// Idempotente: vincular uma tag já vinculada não faz nada.
    pub async fn attach<'e, E>(&self, executor: E, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO customer_tags (customer_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(customer_id)
            .bind(tag_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn attach_many<'e, E>(&self, executor: E, customer_id: Uuid, tag_ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO customer_tags (customer_id, tag_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(customer_id)
        .bind(tag_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn detach<'e, E>(&self, executor: E, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM customer_tags WHERE customer_id = $1 AND tag_id = $2")
            .bind(customer_id)
            .bind(tag_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
