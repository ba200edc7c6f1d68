// src/db/customer_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{ContactType, Customer, CustomerSearchRow, SearchParams},
};

// Mesmo formato de linha do procedimento search_customers, para um único cliente.
const CUSTOMER_VIEW_SQL: &str = r#"
    SELECT
        c.id,
        c.organization_id,
        c.name,
        c.stage_id,
        c.created_at,
        COALESCE((
            SELECT jsonb_agg(jsonb_build_object('id', cc.id, 'type', cc.type, 'value', cc.value)
                             ORDER BY cc.created_at)
            FROM customer_contacts cc
            WHERE cc.customer_id = c.id
        ), '[]'::jsonb) AS contacts,
        COALESCE((
            SELECT jsonb_agg(jsonb_build_object('id', t.id, 'name', t.name, 'color', t.color)
                             ORDER BY t.name)
            FROM customer_tags ct
            JOIN tags t ON t.id = ct.tag_id
            WHERE ct.customer_id = c.id
        ), '[]'::jsonb) AS tags,
        COALESCE((
            SELECT jsonb_object_agg(d.key_name, v.value)
            FROM customer_field_values v
            JOIN custom_field_definitions d ON d.id = v.field_id
            WHERE v.customer_id = c.id
        ), '{}'::jsonb) AS field_values,
        (
            SELECT jsonb_build_object(
                'id', s.id, 'name', s.name, 'color', s.color, 'position', s.position,
                'crm_funnels', jsonb_build_object('id', fu.id, 'name', fu.name)
            )
            FROM crm_stages s
            JOIN crm_funnels fu ON fu.id = s.funnel_id
            WHERE s.id = c.stage_id
        ) AS crm_stages,
        1::BIGINT AS total_count
    FROM customers c
    WHERE c.organization_id = $1 AND c.id = $2
"#;

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  BUSCA
    // =========================================================================

    /// Chama o procedimento `search_customers` com os argumentos na ordem dele.
    pub async fn search<'e, E>(&self, executor: E, params: &SearchParams) -> Result<Vec<CustomerSearchRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tag_ids: Option<&[Uuid]> = if params.tag_ids.is_empty() {
            None
        } else {
            Some(&params.tag_ids)
        };

        let rows = sqlx::query_as::<_, CustomerSearchRow>(
            r#"
            SELECT id, organization_id, name, stage_id, created_at,
                   contacts, tags, field_values, crm_stages, total_count
            FROM search_customers($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(params.organization_id)
        .bind(params.search_query.as_deref())
        .bind(params.limit)
        .bind(params.offset)
        .bind(params.funnel_id)
        .bind(params.stage_id)
        .bind(tag_ids)
        .bind(params.sort_column.as_str())
        .bind(params.sort_direction.as_str())
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Cliente completo (contatos, tags, campos e etapa) no formato da busca.
    pub async fn find_view<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<CustomerSearchRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, CustomerSearchRow>(CUSTOMER_VIEW_SQL)
            .bind(organization_id)
            .bind(customer_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, organization_id, name, stage_id, created_at, updated_at
            FROM customers
            WHERE organization_id = $1 AND id = $2
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    /// Trava transacional por (organização, valor de contato); liberada no commit/rollback.
    pub async fn lock_contact_value<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        value: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2, 0))")
            .bind(organization_id)
            .bind(value)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Primeiro cliente da organização que possui exatamente este valor de contato.
    pub async fn find_by_contact_value<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        value: &str,
    ) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT c.id
            FROM customers c
            JOIN customer_contacts cc ON cc.customer_id = c.id
            WHERE c.organization_id = $1 AND cc.value = $2
            ORDER BY c.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(organization_id)
        .bind(value)
        .fetch_optional(executor)
        .await?;
        Ok(id)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        stage_id: Option<Uuid>,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (organization_id, name, stage_id)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, stage_id, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(stage_id)
        .fetch_one(executor)
        .await?;
        Ok(customer)
    }

    pub async fn update_name<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
        name: &str,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = $3, updated_at = NOW()
            WHERE organization_id = $1 AND id = $2
            RETURNING id, organization_id, name, stage_id, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .bind(name)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    pub async fn set_stage<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE customers SET stage_id = $3, updated_at = NOW() WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(customer_id)
            .bind(stage_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Remove o cliente; contatos, tags, valores e histórico caem em cascata.
    pub async fn delete_customer<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM customers WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    pub async fn insert_contact<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        contact_type: ContactType,
        value: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO customer_contacts (customer_id, type, value) VALUES ($1, $2, $3)")
            .bind(customer_id)
            .bind(contact_type)
            .bind(value)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_contacts<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM customer_contacts WHERE customer_id = $1")
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    const SEARCH: &str = include_str!("../../migrations/20250301120100_search_customers.sql");

    #[test]
    fn free_text_is_matched_literally() {
        assert!(SEARCH.contains(r"replace(replace(replace(p_term, '\', '\\'), '%', '\%'), '_', '\_')"));
        let escaped = r"ILIKE '%' || escape_like(btrim(p_search_query)) || '%' ESCAPE '\'";
        assert_eq!(SEARCH.matches(escaped).count(), 2);
        assert!(!SEARCH.contains("ILIKE '%' || btrim(p_search_query)"));
    }
}
