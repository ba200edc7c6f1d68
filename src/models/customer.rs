// src/models/customer.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::dialing_codes::decompose_contact_value;

// --- ENUMS ---

// Mapeia o CREATE TYPE contact_type do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "contact_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Email,
    Whatsapp,
    Phone,
    Instagram,
    InstagramId,
    Facebook,
    FacebookId,
    Telegram,
}

impl ContactType {
    /// Ordem declarada: é a ordem das colunas de contato na exportação.
    pub const ALL: [ContactType; 8] = [
        ContactType::Email,
        ContactType::Whatsapp,
        ContactType::Phone,
        ContactType::Instagram,
        ContactType::InstagramId,
        ContactType::Facebook,
        ContactType::FacebookId,
        ContactType::Telegram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactType::Email => "email",
            ContactType::Whatsapp => "whatsapp",
            ContactType::Phone => "phone",
            ContactType::Instagram => "instagram",
            ContactType::InstagramId => "instagram_id",
            ContactType::Facebook => "facebook",
            ContactType::FacebookId => "facebook_id",
            ContactType::Telegram => "telegram",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContactType::Email => "Email",
            ContactType::Whatsapp => "WhatsApp",
            ContactType::Phone => "Phone",
            ContactType::Instagram => "Instagram",
            ContactType::InstagramId => "Instagram ID",
            ContactType::Facebook => "Facebook",
            ContactType::FacebookId => "Facebook ID",
            ContactType::Telegram => "Telegram",
        }
    }

    /// Tipos cujo valor é gravado com o código do país já concatenado.
    pub fn requires_country_code(self) -> bool {
        matches!(self, ContactType::Whatsapp | ContactType::Phone | ContactType::Telegram)
    }
}

// --- LINHAS DO BANCO ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Roberto Silva")]
    pub name: String,
    pub stage_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "VIP")]
    pub name: String,
    #[schema(example = "#f59e0b")]
    pub color: String,
    pub created_at: DateTime<Utc>,
}

// --- FORMATO DO PROCEDIMENTO search_customers ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub contact_type: ContactType,
    #[schema(example = "+5511999999999")]
    pub value: String,
    // Partes para o formulário de edição, calculadas a partir de `value`
    #[serde(default, skip_deserializing, rename = "dialCode")]
    #[schema(example = "+55")]
    pub dial_code: Option<String>,
    #[serde(default, skip_deserializing, rename = "localValue")]
    #[schema(example = "11999999999")]
    pub local_value: String,
}

impl ContactSummary {
    pub fn new(id: Uuid, contact_type: ContactType, value: String) -> Self {
        let parts = decompose_contact_value(contact_type, &value);
        Self {
            id,
            contact_type,
            dial_code: parts.country.map(|c| c.dial_code.to_string()),
            local_value: parts.local,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FunnelSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StageSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub position: i32,
    // O procedimento devolve o funil aninhado como `crm_funnels`
    #[serde(alias = "crm_funnels")]
    pub funnel: FunnelSummary,
}

/// Uma linha exatamente como o procedimento `search_customers` devolve.
/// `total_count` é a contagem do filtro inteiro, repetida em cada linha.
#[derive(Debug, Clone, FromRow)]
pub struct CustomerSearchRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub stage_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub contacts: Json<Vec<ContactSummary>>,
    pub tags: Json<Vec<TagSummary>>,
    pub field_values: Json<HashMap<String, Value>>,
    pub crm_stages: Option<Json<StageSummary>>,
    pub total_count: i64,
}

// --- PARÂMETROS DA BUSCA ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    #[default]
    CreatedAt,
    Stage,
}

impl SortColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::CreatedAt => "created_at",
            SortColumn::Stage => "stage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Argumentos de `search_customers`, na mesma ordem do procedimento.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub organization_id: Uuid,
    pub search_query: Option<String>,
    pub limit: i32,
    pub offset: i32,
    pub funnel_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
}

// --- RESPOSTAS DA API ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: Uuid,
    pub name: String,
    pub stage_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub contacts: Vec<ContactSummary>,
    pub tags: Vec<TagSummary>,
    pub field_values: HashMap<String, Value>,
    pub stage: Option<StageSummary>,
}

impl From<CustomerSearchRow> for CustomerView {
    fn from(row: CustomerSearchRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            stage_id: row.stage_id,
            created_at: row.created_at,
            contacts: row
                .contacts
                .0
                .into_iter()
                .map(|c| ContactSummary::new(c.id, c.contact_type, c.value))
                .collect(),
            tags: row.tags.0,
            field_values: row.field_values.0,
            stage: row.crm_stages.map(|s| s.0),
        }
    }
}

impl CustomerView {
    /// Valores de contato agrupados por tipo, na ordem em que foram cadastrados.
    pub fn contacts_by_type(&self) -> HashMap<ContactType, Vec<&str>> {
        let mut grouped: HashMap<ContactType, Vec<&str>> = HashMap::new();
        for contact in &self.contacts {
            grouped.entry(contact.contact_type).or_default().push(&contact.value);
        }
        grouped
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPage {
    pub items: Vec<CustomerView>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    /// Sequência da busca ecoada ao cliente.
    pub seq: Option<u64>,
    /// Verdadeiro quando uma busca mais nova já foi iniciada; `items` vem vazio.
    pub stale: bool,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[serde(rename = "type")]
    pub contact_type: ContactType,
    #[schema(example = "11999999999")]
    pub value: String,
    // Código de discagem (ex: "+55") para WhatsApp, telefone e Telegram
    #[schema(example = "+55")]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[schema(example = "Roberto Silva")]
    pub name: String,
    #[serde(default)]
    pub contacts: Vec<ContactInput>,
    pub stage_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub field_values: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    pub name: Option<String>,
    // Quando presente, substitui todos os contatos
    pub contacts: Option<Vec<ContactInput>>,
    // Quando presente, move o cliente para a etapa (com histórico)
    pub stage_id: Option<Uuid>,
    #[serde(default)]
    pub field_values: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagPayload {
    #[validate(length(min = 1, max = 50, message = "length"))]
    #[schema(example = "VIP")]
    pub name: String,
    #[schema(example = "#f59e0b")]
    pub color: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagToggleResponse {
    pub customer_id: Uuid,
    pub tag_ids: Vec<Uuid>,
    pub attached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_summary_reads_procedure_shape() {
        let raw = json!({
            "id": Uuid::nil(),
            "name": "Negociação",
            "color": "#22c55e",
            "position": 2,
            "crm_funnels": { "id": Uuid::nil(), "name": "Vendas" }
        });

        let stage: StageSummary = serde_json::from_value(raw).unwrap();
        assert_eq!(stage.funnel.name, "Vendas");

        let out = serde_json::to_value(&stage).unwrap();
        assert_eq!(out["funnel"]["name"], "Vendas");
    }

    #[test]
    fn contact_summary_uses_type_key() {
        let contact: ContactSummary = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "type": "instagram_id",
            "value": "178414"
        }))
        .unwrap();
        assert_eq!(contact.contact_type, ContactType::InstagramId);
        assert_eq!(contact.dial_code, None);
    }

    #[test]
    fn contact_summary_splits_dial_code_for_editing() {
        let contact = ContactSummary::new(Uuid::nil(), ContactType::Whatsapp, "+5511999999999".into());
        assert_eq!(contact.dial_code.as_deref(), Some("+55"));
        assert_eq!(contact.local_value, "11999999999");

        let email = ContactSummary::new(Uuid::nil(), ContactType::Email, "ana@example.com".into());
        assert_eq!(email.dial_code, None);
        assert_eq!(email.local_value, "ana@example.com");
    }

    #[test]
    fn only_phone_like_types_need_country_code() {
        let with_code: Vec<_> = ContactType::ALL
            .into_iter()
            .filter(|t| t.requires_country_code())
            .collect();
        assert_eq!(with_code, vec![ContactType::Whatsapp, ContactType::Phone, ContactType::Telegram]);
    }
}
