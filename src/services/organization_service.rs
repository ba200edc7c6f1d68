// src/services/organization_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        events::{CrmEvent, EventBus},
    },
    db::{FunnelRepository, OrganizationRepository},
    models::{
        crm::{DEFAULT_FUNNEL_NAME, DEFAULT_STAGES},
        organization::{MemberRole, MyOrganization, Organization},
    },
};

const JOIN_CODE_LEN: usize = 8;
const MAX_SLUG_ATTEMPTS: u32 = 20;

#[derive(Clone)]
pub struct OrganizationService {
    org_repo: OrganizationRepository,
    funnel_repo: FunnelRepository,
    pool: PgPool,
    events: EventBus,
}

impl OrganizationService {
    pub fn new(org_repo: OrganizationRepository, funnel_repo: FunnelRepository, pool: PgPool, events: EventBus) -> Self {
        Self { org_repo, funnel_repo, pool, events }
    }

    /// Cria a organização e, atomicamente, o vínculo de dono e o funil padrão.
    pub async fn create_with_owner(
        &self,
        name: &str,
        owner_id: Uuid,
        partner_id: Option<Uuid>,
    ) -> Result<Organization, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::NameRequired);
        }

        let mut tx = self.pool.begin().await?;

        let base_slug = slugify(name);
        let mut slug = base_slug.clone();
        let mut attempt = 1;
        while self.org_repo.slug_exists(&mut *tx, &slug).await? {
            attempt += 1;
            if attempt > MAX_SLUG_ATTEMPTS {
                slug = format!("{base_slug}-{}", &generate_join_code().to_lowercase()[..4]);
                break;
            }
            slug = format!("{base_slug}-{attempt}");
        }

        let organization = self
            .org_repo
            .create_organization(&mut *tx, name, &slug, &generate_join_code(), partner_id)
            .await?;

        self.org_repo
            .add_member(&mut *tx, organization.id, owner_id, MemberRole::Owner)
            .await?;

        let funnel = self
            .funnel_repo
            .create_funnel(&mut *tx, organization.id, DEFAULT_FUNNEL_NAME, 0)
            .await?;
        for (position, (stage_name, color)) in DEFAULT_STAGES.iter().enumerate() {
            self.funnel_repo
                .create_stage(&mut *tx, funnel.id, stage_name, color, position as i32)
                .await?;
        }

        tx.commit().await?;

        self.events.publish(CrmEvent::OrganizationCreated {
            organization_id: organization.id,
            owner_id,
        });

        Ok(organization)
    }

    /// Entra numa organização ativa como atendente, usando o código de convite.
    pub async fn join(&self, organization_id: Uuid, user_id: Uuid, join_code: &str) -> Result<Organization, AppError> {
        let code = join_code.trim().to_uppercase();

        let mut tx = self.pool.begin().await?;

        let organization = self
            .org_repo
            .find_by_join_code(&mut *tx, &code)
            .await?
            .filter(|org| org.id == organization_id)
            .ok_or(AppError::InvalidJoinCode)?;

        self.org_repo
            .add_member(&mut *tx, organization.id, user_id, MemberRole::Agent)
            .await?;

        tx.commit().await?;

        self.events.publish(CrmEvent::MemberJoined { organization_id, user_id });
        Ok(organization)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<MyOrganization>, AppError> {
        self.org_repo.list_for_user(user_id).await
    }
}

/// Minúsculas ASCII separadas por hífen; acentos comuns são removidos.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        };

        if mapped.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(mapped);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "org".to_string()
    } else {
        slug
    }
}

/// Código de convite: 8 caracteres maiúsculos derivados de um UUID v4.
pub fn generate_join_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(JOIN_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_accents_and_punctuation() {
        assert_eq!(slugify("Clínica São João"), "clinica-sao-joao");
        assert_eq!(slugify("  Ótica & Cia.  "), "otica-cia");
        assert_eq!(slugify("!!!"), "org");
    }

    #[test]
    fn join_code_is_uppercase_hex() {
        let code = generate_join_code();
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
