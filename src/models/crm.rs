// src/models/crm.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
//  FUNIS E ETAPAS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Vendas")]
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: Uuid,
    pub funnel_id: Uuid,
    #[schema(example = "Em Negociação")]
    pub name: String,
    #[schema(example = "#FF5733")]
    pub color: String,
    #[schema(example = 1)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelWithStages {
    #[serde(flatten)]
    pub funnel: Funnel,
    pub stages: Vec<Stage>,
}

// Histórico só recebe inserções
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub from_stage_id: Option<Uuid>,
    pub to_stage_id: Option<Uuid>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

/// Funil criado junto com cada organização nova.
pub const DEFAULT_FUNNEL_NAME: &str = "Vendas";
pub const DEFAULT_STAGES: [(&str, &str); 3] = [
    ("Novo contato", "#3b82f6"),
    ("Em negociação", "#f59e0b"),
    ("Fechado", "#22c55e"),
];

// =============================================================================
//  CAMPOS PERSONALIZADOS
// =============================================================================

// Mapeia o CREATE TYPE field_type do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "field_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    Multiselect,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Data de aniversário")]
    pub name: String,
    #[schema(example = "birthday")]
    pub key_name: String,

    pub field_type: FieldType,

    // Opções para Selects (Ex: ["A", "B"]).
    #[schema(example = json!(["Varejo", "Atacado"]))]
    pub options: Option<Value>,

    pub is_required: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl FieldDefinition {
    /// Opções declaradas como texto; definições sem opções devolvem vazio.
    pub fn option_values(&self) -> Vec<&str> {
        self.options
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunnelPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Pós-venda")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Qualificado")]
    pub name: String,
    #[schema(example = "#8b5cf6")]
    pub color: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStagePayload {
    // null remove o cliente do funil
    pub stage_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Data de aniversário")]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "length"))]
    #[schema(example = "birthday")]
    pub key_name: String,
    pub field_type: FieldType,
    pub options: Option<Value>,
    #[serde(default)]
    pub is_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_matches_database_labels() {
        assert_eq!(serde_json::to_value(FieldType::Multiselect).unwrap(), json!("multiselect"));
        let parsed: FieldType = serde_json::from_value(json!("date")).unwrap();
        assert_eq!(parsed, FieldType::Date);
    }
}
