// src/db/funnel_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{Funnel, Stage, StageHistoryEntry},
};

#[derive(Clone)]
pub struct FunnelRepository {
    pool: PgPool,
}

impl FunnelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  FUNIS
    // =========================================================================

    pub async fn create_funnel<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        position: i32,
    ) -> Result<Funnel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let funnel = sqlx::query_as::<_, Funnel>(
            r#"
            INSERT INTO crm_funnels (organization_id, name, position)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, position, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(position)
        .fetch_one(executor)
        .await?;
        Ok(funnel)
    }

    pub async fn list_funnels<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<Funnel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let funnels = sqlx::query_as::<_, Funnel>(
            r#"
            SELECT id, organization_id, name, position, created_at
            FROM crm_funnels
            WHERE organization_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(funnels)
    }

    pub async fn next_funnel_position<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let next: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM crm_funnels WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_one(executor)
                .await?;
        Ok(next)
    }

    // =========================================================================
    //  ETAPAS
    // =========================================================================

    pub async fn create_stage<'e, E>(
        &self,
        executor: E,
        funnel_id: Uuid,
        name: &str,
        color: &str,
        position: i32,
    ) -> Result<Stage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            INSERT INTO crm_stages (funnel_id, name, color, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, funnel_id, name, color, position
            "#,
        )
        .bind(funnel_id)
        .bind(name)
        .bind(color)
        .bind(position)
        .fetch_one(executor)
        .await?;
        Ok(stage)
    }

    /// Todas as etapas dos funis da organização, ordenadas por funil e posição.
    pub async fn list_stages<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<Stage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT s.id, s.funnel_id, s.name, s.color, s.position
            FROM crm_stages s
            JOIN crm_funnels f ON f.id = s.funnel_id
            WHERE f.organization_id = $1
            ORDER BY f.position ASC, s.position ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(stages)
    }

    /// Etapa, desde que o funil dela pertença à organização.
    pub async fn find_stage_in_org<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        stage_id: Uuid,
    ) -> Result<Option<Stage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT s.id, s.funnel_id, s.name, s.color, s.position
            FROM crm_stages s
            JOIN crm_funnels f ON f.id = s.funnel_id
            WHERE f.organization_id = $1 AND s.id = $2
            "#,
        )
        .bind(organization_id)
        .bind(stage_id)
        .fetch_optional(executor)
        .await?;
        Ok(stage)
    }

    pub async fn funnel_exists<'e, E>(&self, executor: E, organization_id: Uuid, funnel_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM crm_funnels WHERE organization_id = $1 AND id = $2)")
                .bind(organization_id)
                .bind(funnel_id)
                .fetch_one(executor)
                .await?;
        Ok(exists)
    }

    pub async fn next_stage_position<'e, E>(&self, executor: E, funnel_id: Uuid) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let next: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM crm_stages WHERE funnel_id = $1")
            .bind(funnel_id)
            .fetch_one(executor)
            .await?;
        Ok(next)
    }

    pub async fn update_stage(
        &self,
        organization_id: Uuid,
        stage_id: Uuid,
        name: &str,
        color: &str,
        position: i32,
    ) -> Result<Option<Stage>, AppError> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            UPDATE crm_stages s
            SET name = $3, color = $4, position = $5
            FROM crm_funnels f
            WHERE f.id = s.funnel_id AND f.organization_id = $1 AND s.id = $2
            RETURNING s.id, s.funnel_id, s.name, s.color, s.position
            "#,
        )
        .bind(organization_id)
        .bind(stage_id)
        .bind(name)
        .bind(color)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stage)
    }

    /// Clientes na etapa removida ficam sem etapa (ON DELETE SET NULL).
    pub async fn delete_stage(&self, organization_id: Uuid, stage_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM crm_stages s
            USING crm_funnels f
            WHERE f.id = s.funnel_id AND f.organization_id = $1 AND s.id = $2
            "#,
        )
        .bind(organization_id)
        .bind(stage_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  HISTÓRICO
    // =========================================================================

    pub async fn insert_history<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        from_stage_id: Option<Uuid>,
        to_stage_id: Option<Uuid>,
        changed_by: Option<Uuid>,
    ) -> Result<StageHistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, StageHistoryEntry>(
            r#"
            INSERT INTO customer_stage_history (customer_id, from_stage_id, to_stage_id, changed_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_id, from_stage_id, to_stage_id, changed_by, changed_at
            "#,
        )
        .bind(customer_id)
        .bind(from_stage_id)
        .bind(to_stage_id)
        .bind(changed_by)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    pub async fn list_history(&self, customer_id: Uuid) -> Result<Vec<StageHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, StageHistoryEntry>(
            r#"
            SELECT id, customer_id, from_stage_id, to_stage_id, changed_by, changed_at
            FROM customer_stage_history
            WHERE customer_id = $1
            ORDER BY changed_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
