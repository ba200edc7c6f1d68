// src/db/prompt_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::ai::Prompt};

#[derive(Clone)]
pub struct PromptRepository {
    pool: PgPool,
}

impl PromptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_prompts(&self, organization_id: Uuid) -> Result<Vec<Prompt>, AppError> {
        let prompts = sqlx::query_as::<_, Prompt>(
            r#"
            SELECT id, organization_id, name, instructions, model, temperature, is_active, created_at
            FROM prompts
            WHERE organization_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prompts)
    }

    pub async fn create_prompt(
        &self,
        organization_id: Uuid,
        name: &str,
        instructions: &str,
        model: Option<&str>,
        temperature: f32,
    ) -> Result<Prompt, AppError> {
        let prompt = sqlx::query_as::<_, Prompt>(
            r#"
            INSERT INTO prompts (organization_id, name, instructions, model, temperature)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, name, instructions, model, temperature, is_active, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(instructions)
        .bind(model)
        .bind(temperature)
        .fetch_one(&self.pool)
        .await?;
        Ok(prompt)
    }

    pub async fn find_active(&self, organization_id: Uuid, prompt_id: Uuid) -> Result<Option<Prompt>, AppError> {
        let prompt = sqlx::query_as::<_, Prompt>(
            r#"
            SELECT id, organization_id, name, instructions, model, temperature, is_active, created_at
            FROM prompts
            WHERE organization_id = $1 AND id = $2 AND is_active
            "#,
        )
        .bind(organization_id)
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prompt)
    }
}
