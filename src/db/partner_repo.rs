// src/db/partner_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::partner::{ContactMessage, PartnerOrganization},
};

#[derive(Clone)]
pub struct PartnerRepository {
    pool: PgPool,
}

impl PartnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Organizações indicadas pelo parceiro, com o total de membros ativos.
    pub async fn referred_organizations(&self, partner_id: Uuid) -> Result<Vec<PartnerOrganization>, AppError> {
        let orgs = sqlx::query_as::<_, PartnerOrganization>(
            r#"
            SELECT o.id, o.name, o.is_active, o.created_at,
                   COUNT(m.user_id) FILTER (WHERE m.is_active) AS member_count
            FROM organizations o
            LEFT JOIN organization_members m ON m.organization_id = o.id
            WHERE o.partner_id = $1
            GROUP BY o.id
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }
}

#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_message(
        &self,
        name: &str,
        email: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessage, AppError> {
        let stored = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (name, email, subject, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, subject, message, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }
}
