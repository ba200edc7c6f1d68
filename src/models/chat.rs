// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::customer::{ContactType, CustomerView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "channel_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Whatsapp,
    WhatsappBusiness,
    Email,
}

impl ChannelKind {
    /// Quais tipos de contato podem iniciar conversa neste canal.
    pub fn accepts(self, contact: ContactType) -> bool {
        match self {
            ChannelKind::Whatsapp | ChannelKind::WhatsappBusiness => {
                matches!(contact, ContactType::Whatsapp | ContactType::Phone)
            }
            ChannelKind::Email => contact == ContactType::Email,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "chat_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Suporte")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "WhatsApp Comercial")]
    pub name: String,
    pub kind: ChannelKind,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub customer_id: Uuid,
    pub channel_id: Uuid,
    #[schema(example = "+5511999999999")]
    pub contact_value: String,
    pub assigned_to: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub direction: MessageDirection,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartChatResponse {
    pub chat: Chat,
    pub customer: CustomerView,
    /// Falso quando uma conversa aberta já existia para o mesmo contato e canal.
    pub created: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartChatPayload {
    // Cliente já selecionado; sem ele, busca pelo valor do contato ou cria
    pub customer_id: Option<Uuid>,
    #[schema(example = "Roberto Silva")]
    pub customer_name: Option<String>,
    pub contact_type: ContactType,
    #[schema(example = "+5511999999999")]
    pub contact_value: String,
    pub channel_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_accept_only_compatible_contacts() {
        assert!(ChannelKind::Whatsapp.accepts(ContactType::Whatsapp));
        assert!(ChannelKind::WhatsappBusiness.accepts(ContactType::Phone));
        assert!(!ChannelKind::Whatsapp.accepts(ContactType::Email));
        assert!(ChannelKind::Email.accepts(ContactType::Email));
        assert!(!ChannelKind::Email.accepts(ContactType::Telegram));
    }
}
