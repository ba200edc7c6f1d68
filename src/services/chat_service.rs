// src/services/chat_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        dialing_codes::format_contact_value,
        error::AppError,
        events::{CrmEvent, EventBus},
    },
    db::ChatRepository,
    models::{
        chat::{Channel, StartChatPayload, StartChatResponse, Team},
        customer::{ContactInput, ContactType, CreateCustomerPayload, CustomerView},
    },
    services::customer_service::CustomerService,
};

/// Contato escolhido no assistente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedContact {
    pub contact_type: ContactType,
    pub value: String,
}

/// Assistente de nova conversa: cliente -> contato -> canal.
#[derive(Debug, Clone, PartialEq)]
pub enum StartChatFlow {
    SelectCustomer,
    PickContact {
        customer: CustomerView,
    },
    PickChannel {
        customer: CustomerView,
        contact: SelectedContact,
    },
    Ready {
        customer: CustomerView,
        contact: SelectedContact,
        channel: Channel,
    },
}

impl Default for StartChatFlow {
    fn default() -> Self {
        Self::SelectCustomer
    }
}

impl StartChatFlow {
    pub fn step(&self) -> &'static str {
        match self {
            StartChatFlow::SelectCustomer => "select_customer",
            StartChatFlow::PickContact { .. } => "pick_contact",
            StartChatFlow::PickChannel { .. } => "pick_channel",
            StartChatFlow::Ready { .. } => "ready",
        }
    }

    /// Escolher outro cliente reinicia o fluxo a partir do contato.
    pub fn select_customer(self, customer: CustomerView) -> Self {
        StartChatFlow::PickContact { customer }
    }

    /// O contato precisa pertencer ao cliente selecionado.
    pub fn select_contact(self, contact_type: ContactType, value: &str) -> Result<Self, AppError> {
        let customer = match self {
            StartChatFlow::PickContact { customer }
            | StartChatFlow::PickChannel { customer, .. }
            | StartChatFlow::Ready { customer, .. } => customer,
            StartChatFlow::SelectCustomer => return Err(out_of_order("select_contact")),
        };

        let known = customer
            .contacts
            .iter()
            .any(|c| c.contact_type == contact_type && c.value == value);
        if !known {
            return Err(AppError::NotFound("Contato"));
        }

        Ok(StartChatFlow::PickChannel {
            customer,
            contact: SelectedContact { contact_type, value: value.to_string() },
        })
    }

    pub fn pick_channel(self, channel: Channel) -> Result<Self, AppError> {
        let StartChatFlow::PickChannel { customer, contact } = self else {
            return Err(out_of_order("pick_channel"));
        };

        if !channel.kind.accepts(contact.contact_type) {
            return Err(AppError::InvalidContactForChannel);
        }

        Ok(StartChatFlow::Ready { customer, contact, channel })
    }

    /// Volta um passo.
    pub fn back(self) -> Self {
        match self {
            StartChatFlow::SelectCustomer | StartChatFlow::PickContact { .. } => StartChatFlow::SelectCustomer,
            StartChatFlow::PickChannel { customer, .. } => StartChatFlow::PickContact { customer },
            StartChatFlow::Ready { customer, contact, .. } => StartChatFlow::PickChannel { customer, contact },
        }
    }
}

fn out_of_order(step: &str) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("passo '{step}' fora de ordem no assistente de conversa"))
}

/// Valor do contato na mesma forma em que é gravado no cadastro do cliente.
pub fn normalize_contact_value(contact_type: ContactType, raw: &str) -> Result<String, AppError> {
    let value = format_contact_value(contact_type, None, raw);
    if value.is_empty() {
        return Err(AppError::ContactRequired);
    }
    Ok(value)
}

#[derive(Clone)]
pub struct ChatService {
    repo: ChatRepository,
    customers: CustomerService,
    pool: PgPool,
    events: EventBus,
}

impl ChatService {
    pub fn new(repo: ChatRepository, customers: CustomerService, pool: PgPool, events: EventBus) -> Self {
        Self { repo, customers, pool, events }
    }

    pub async fn list_channels(&self, organization_id: Uuid) -> Result<Vec<Channel>, AppError> {
        self.repo.list_channels(organization_id).await
    }

    pub async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<Team>, AppError> {
        self.repo.list_teams(organization_id).await
    }

    /// Encontra ou cria o cliente, depois encontra ou cria a conversa aberta
    /// para (canal, contato). Tudo numa transação.
    pub async fn start_chat(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        payload: &StartChatPayload,
    ) -> Result<StartChatResponse, AppError> {
        let contact_value = normalize_contact_value(payload.contact_type, &payload.contact_value)?;
        let contact_value = contact_value.as_str();

        let mut tx = self.pool.begin().await?;
        self.customers.lock_contact_value(&mut tx, organization_id, contact_value).await?;

        let channel = self
            .repo
            .find_channel(&mut *tx, organization_id, payload.channel_id)
            .await?
            .ok_or(AppError::NotFound("Canal"))?;
        if !channel.kind.accepts(payload.contact_type) {
            return Err(AppError::InvalidContactForChannel);
        }

        // 1. Cliente: pelo id, pelo valor exato do contato, ou novo
        let existing_id = match payload.customer_id {
            Some(id) => Some(id),
            None => {
                self.customers
                    .find_by_contact_value(&mut tx, organization_id, contact_value)
                    .await?
            }
        };

        let (customer, customer_created) = match existing_id {
            Some(id) => (self.customers.view_in(&mut tx, organization_id, id).await?, false),
            None => {
                let name = payload
                    .customer_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(contact_value);
                let new_customer = CreateCustomerPayload {
                    name: name.to_string(),
                    contacts: vec![ContactInput {
                        contact_type: payload.contact_type,
                        value: contact_value.to_string(),
                        country_code: None,
                    }],
                    stage_id: None,
                    tag_ids: Vec::new(),
                    field_values: Default::default(),
                };
                let created = self.customers.create_in(&mut tx, organization_id, user_id, &new_customer).await?;
                (self.customers.view_in(&mut tx, organization_id, created.id).await?, true)
            }
        };

        // 2. O assistente valida contato e canal na ordem do fluxo
        let flow = StartChatFlow::default()
            .select_customer(customer)
            .select_contact(payload.contact_type, contact_value)?
            .pick_channel(channel)?;
        let StartChatFlow::Ready { customer, contact, channel } = flow else {
            return Err(out_of_order("start_chat"));
        };

        // 3. Conversa aberta existente ou nova
        let (chat, created) = match self
            .repo
            .find_open_chat(&mut *tx, organization_id, channel.id, &contact.value)
            .await?
        {
            Some(chat) => (chat, false),
            None => match self
                .repo
                .insert_open_chat(&mut *tx, organization_id, customer.id, &channel, &contact.value, user_id)
                .await?
            {
                Some(chat) => (chat, true),
                None => {
                    let chat = self
                        .repo
                        .find_open_chat(&mut *tx, organization_id, channel.id, &contact.value)
                        .await?
                        .ok_or(AppError::NotFound("Conversa"))?;
                    (chat, false)
                }
            },
        };

        tx.commit().await?;

        if customer_created {
            self.events.publish(CrmEvent::CustomerCreated { organization_id, customer_id: customer.id });
        }
        self.events.publish(CrmEvent::ContactSelected {
            organization_id,
            customer_id: customer.id,
            contact_type: contact.contact_type,
            value: contact.value.clone(),
        });
        self.events.publish(CrmEvent::ChatStarted { organization_id, chat_id: chat.id, created });

        tracing::info!(chat_id = %chat.id, created, "conversa iniciada");
        Ok(StartChatResponse { chat, customer, created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chat::ChannelKind, customer::ContactSummary};
    use chrono::Utc;
    use std::collections::HashMap;

    fn roberto() -> CustomerView {
        CustomerView {
            id: Uuid::new_v4(),
            name: "Roberto Silva".to_string(),
            stage_id: None,
            created_at: Utc::now(),
            contacts: vec![ContactSummary::new(Uuid::new_v4(), ContactType::Whatsapp, "+5511999999999".to_string())],
            tags: Vec::new(),
            field_values: HashMap::new(),
            stage: None,
        }
    }

    fn channel(kind: ChannelKind) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            name: "Recepção".to_string(),
            kind,
            team_id: None,
            is_active: true,
        }
    }

    #[test]
    fn selecting_contact_moves_to_channel_step_with_customer() {
        let customer = roberto();
        let flow = StartChatFlow::default()
            .select_customer(customer.clone())
            .select_contact(ContactType::Whatsapp, "+5511999999999")
            .unwrap();

        assert_eq!(flow.step(), "pick_channel");
        assert_eq!(
            flow,
            StartChatFlow::PickChannel {
                customer,
                contact: SelectedContact {
                    contact_type: ContactType::Whatsapp,
                    value: "+5511999999999".to_string(),
                },
            }
        );
    }

    #[test]
    fn typed_contact_matches_stored_customer_contact() {
        let value = normalize_contact_value(ContactType::Whatsapp, " +55 (11) 99999-9999 ").unwrap();
        assert_eq!(value, "+5511999999999");

        let flow = StartChatFlow::default().select_customer(roberto()).select_contact(ContactType::Whatsapp, &value);
        assert!(flow.is_ok());

        assert_eq!(normalize_contact_value(ContactType::Telegram, " @roberto ").unwrap(), "@roberto");
        assert!(matches!(normalize_contact_value(ContactType::Phone, "   "), Err(AppError::ContactRequired)));
    }

    #[test]
    fn contact_must_belong_to_customer() {
        let result = StartChatFlow::default()
            .select_customer(roberto())
            .select_contact(ContactType::Whatsapp, "+5511888888888");
        assert!(matches!(result, Err(AppError::NotFound("Contato"))));
    }

    #[test]
    fn whatsapp_contact_does_not_fit_email_channel() {
        let flow = StartChatFlow::default()
            .select_customer(roberto())
            .select_contact(ContactType::Whatsapp, "+5511999999999")
            .unwrap();

        assert!(matches!(flow.clone().pick_channel(channel(ChannelKind::Email)), Err(AppError::InvalidContactForChannel)));
        assert_eq!(flow.pick_channel(channel(ChannelKind::Whatsapp)).unwrap().step(), "ready");
    }

    #[test]
    fn steps_cannot_be_skipped_and_back_unwinds() {
        assert!(StartChatFlow::default().select_contact(ContactType::Email, "a@b.c").is_err());
        assert!(StartChatFlow::default().pick_channel(channel(ChannelKind::Email)).is_err());

        let ready = StartChatFlow::default()
            .select_customer(roberto())
            .select_contact(ContactType::Whatsapp, "+5511999999999")
            .unwrap()
            .pick_channel(channel(ChannelKind::WhatsappBusiness))
            .unwrap();

        let back = ready.back();
        assert_eq!(back.step(), "pick_channel");
        assert_eq!(back.back().step(), "pick_contact");
    }
}
