//! Barramento de eventos de domínio tipados.
//!
//! Substitui callbacks globais: quem precisa reagir a um evento
//! (contato selecionado, etiqueta alterada, conversa iniciada) assina o
//! canal em vez de depender de estado global.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::customer::ContactType;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrmEvent {
    CustomerCreated {
        organization_id: Uuid,
        customer_id: Uuid,
    },
    CustomerUpdated {
        organization_id: Uuid,
        customer_id: Uuid,
    },
    CustomerDeleted {
        organization_id: Uuid,
        customer_id: Uuid,
    },
    ContactSelected {
        organization_id: Uuid,
        customer_id: Uuid,
        contact_type: ContactType,
        value: String,
    },
    TagToggled {
        organization_id: Uuid,
        customer_id: Uuid,
        tag_id: Uuid,
        attached: bool,
    },
    StageChanged {
        organization_id: Uuid,
        customer_id: Uuid,
        from_stage_id: Option<Uuid>,
        to_stage_id: Option<Uuid>,
    },
    ChatStarted {
        organization_id: Uuid,
        chat_id: Uuid,
        created: bool,
    },
    OrganizationCreated {
        organization_id: Uuid,
        owner_id: Uuid,
    },
    MemberJoined {
        organization_id: Uuid,
        user_id: Uuid,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CrmEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publicar sem assinantes não é erro.
    pub fn publish(&self, event: CrmEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrmEvent> {
        self.tx.subscribe()
    }
}

/// Registra todos os eventos no log.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::info!(target: "crm_events", "{json}"),
                    Err(e) => tracing::warn!("evento não serializável: {e}"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("logger de eventos atrasado, {skipped} eventos descartados");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_typed_payloads() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let customer_id = Uuid::new_v4();
        let organization_id = Uuid::new_v4();

        bus.publish(CrmEvent::ContactSelected {
            organization_id,
            customer_id,
            contact_type: ContactType::Whatsapp,
            value: "+5511999999999".into(),
        });

        let got = rx.recv().await.unwrap();
        assert_eq!(
            got,
            CrmEvent::ContactSelected {
                organization_id,
                customer_id,
                contact_type: ContactType::Whatsapp,
                value: "+5511999999999".into(),
            }
        );
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.publish(CrmEvent::MemberJoined {
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(CrmEvent::ChatStarted {
            organization_id: Uuid::nil(),
            chat_id: Uuid::nil(),
            created: true,
        })
        .unwrap();
        assert_eq!(json["event"], "chat_started");
        assert_eq!(json["created"], true);
    }
}
