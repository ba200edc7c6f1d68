// src/models/organization.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Organization (o "Tenant")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Clínica Sorriso")]
    pub name: String,
    #[schema(example = "clinica-sorriso")]
    pub slug: String,
    // Só o dono precisa ver o código de convite
    #[serde(skip_serializing)]
    pub join_code: String,
    pub is_active: bool,
    pub partner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Cargos (ordem importa: agent < admin < owner)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Agent,
    Admin,
    Owner,
}

// ---
// 3. A "ponte" usuário-organização
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMember {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

// O que a listagem "minhas organizações" devolve
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyOrganization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub role: MemberRole,
    // Preenchido apenas para owner/admin
    pub join_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationPayload {
    #[validate(length(min = 1, max = 120, message = "length"))]
    #[schema(example = "Clínica Sorriso")]
    pub name: String,
    // Parceiro que indicou a organização
    #[serde(default)]
    pub partner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinOrganizationPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "7F3A9C01")]
    pub join_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(MemberRole::Agent < MemberRole::Admin);
        assert!(MemberRole::Admin < MemberRole::Owner);
    }
}
