// src/db/organization_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::organization::{MemberRole, MyOrganization, Organization, OrganizationMember},
};

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Vínculo ativo do usuário com a organização (também ativa).
    /// Esta é a verificação de autorização mais importante.
    pub async fn find_active_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>, AppError> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            r#"
            SELECT m.organization_id, m.user_id, m.role, m.is_active, m.joined_at
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.organization_id = $1
              AND m.user_id = $2
              AND m.is_active
              AND o.is_active
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn create_organization<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        join_code: &str,
        partner_id: Option<Uuid>,
    ) -> Result<Organization, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug, join_code, partner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, join_code, is_active, partner_id, created_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(join_code)
        .bind(partner_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!("organização '{slug}'"));
                }
            }
            e.into()
        })
    }

    pub async fn slug_exists<'e, E>(&self, executor: E, slug: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE slug = $1)")
            .bind(slug)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn find_by_join_code<'e, E>(&self, executor: E, join_code: &str) -> Result<Option<Organization>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, join_code, is_active, partner_id, created_at
            FROM organizations
            WHERE join_code = $1 AND is_active
            "#,
        )
        .bind(join_code)
        .fetch_optional(executor)
        .await?;
        Ok(org)
    }

    /// Atribui um utilizador a uma organização (na tabela-ponte).
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<OrganizationMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, OrganizationMember>(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING organization_id, user_id, role, is_active, joined_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::AlreadyMember;
                }
            }
            e.into()
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<MyOrganization>, AppError> {
        let orgs = sqlx::query_as::<_, MyOrganization>(
            r#"
            SELECT o.id, o.name, o.slug, m.role,
                   CASE WHEN m.role IN ('owner', 'admin') THEN o.join_code END AS join_code
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1 AND m.is_active AND o.is_active
            ORDER BY o.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }
}
