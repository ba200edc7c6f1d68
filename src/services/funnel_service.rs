// src/services/funnel_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        events::{CrmEvent, EventBus},
        keyed_mutex::KeyedMutex,
    },
    db::{CustomerRepository, FunnelRepository},
    models::{
        crm::{Funnel, FunnelWithStages, Stage, StageHistoryEntry, StagePayload},
        customer::Customer,
    },
};

const DEFAULT_STAGE_COLOR: &str = "#64748b";

#[derive(Clone)]
pub struct FunnelService {
    repo: FunnelRepository,
    customer_repo: CustomerRepository,
    pool: PgPool,
    events: EventBus,
    mutations: KeyedMutex<Uuid>,
}

impl FunnelService {
    pub fn new(
        repo: FunnelRepository,
        customer_repo: CustomerRepository,
        pool: PgPool,
        events: EventBus,
        mutations: KeyedMutex<Uuid>,
    ) -> Self {
        Self { repo, customer_repo, pool, events, mutations }
    }

    pub async fn list_with_stages(&self, organization_id: Uuid) -> Result<Vec<FunnelWithStages>, AppError> {
        let funnels = self.repo.list_funnels(&self.pool, organization_id).await?;
        let stages = self.repo.list_stages(&self.pool, organization_id).await?;
        Ok(group_stages(funnels, stages))
    }

    pub async fn create_funnel(&self, organization_id: Uuid, name: &str) -> Result<Funnel, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::NameRequired);
        }

        let mut tx = self.pool.begin().await?;
        let position = self.repo.next_funnel_position(&mut *tx, organization_id).await?;
        let funnel = self.repo.create_funnel(&mut *tx, organization_id, name, position).await?;
        tx.commit().await?;
        Ok(funnel)
    }

    pub async fn create_stage(
        &self,
        organization_id: Uuid,
        funnel_id: Uuid,
        payload: &StagePayload,
    ) -> Result<Stage, AppError> {
        let mut tx = self.pool.begin().await?;

        if !self.repo.funnel_exists(&mut *tx, organization_id, funnel_id).await? {
            return Err(AppError::NotFound("Funil"));
        }

        let position = match payload.position {
            Some(position) => position,
            None => self.repo.next_stage_position(&mut *tx, funnel_id).await?,
        };
        let color = payload.color.as_deref().unwrap_or(DEFAULT_STAGE_COLOR);

        let stage = self
            .repo
            .create_stage(&mut *tx, funnel_id, payload.name.trim(), color, position)
            .await?;
        tx.commit().await?;
        Ok(stage)
    }

    pub async fn update_stage(
        &self,
        organization_id: Uuid,
        stage_id: Uuid,
        payload: &StagePayload,
    ) -> Result<Stage, AppError> {
        let current = self
            .repo
            .find_stage_in_org(&self.pool, organization_id, stage_id)
            .await?
            .ok_or(AppError::NotFound("Etapa"))?;

        let color = payload.color.as_deref().unwrap_or(&current.color);
        let position = payload.position.unwrap_or(current.position);

        self.repo
            .update_stage(organization_id, stage_id, payload.name.trim(), color, position)
            .await?
            .ok_or(AppError::NotFound("Etapa"))
    }

    pub async fn delete_stage(&self, organization_id: Uuid, stage_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_stage(organization_id, stage_id).await? {
            return Err(AppError::NotFound("Etapa"));
        }
        Ok(())
    }

    /// Move o cliente de etapa e registra o histórico na mesma transação.
    pub async fn change_stage(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
        to_stage_id: Option<Uuid>,
        changed_by: Uuid,
    ) -> Result<Option<StageHistoryEntry>, AppError> {
        let _turn = self.mutations.lock(customer_id).await;
        let mut tx = self.pool.begin().await?;

        let customer = self
            .customer_repo
            .find_customer(&mut *tx, organization_id, customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        let change = apply_stage_change(&mut tx, &self.repo, &self.customer_repo, &customer, to_stage_id, changed_by)
            .await?;
        tx.commit().await?;

        Ok(match change {
            Some((entry, event)) => {
                self.events.publish(event);
                Some(entry)
            }
            None => None,
        })
    }

    pub async fn history(&self, organization_id: Uuid, customer_id: Uuid) -> Result<Vec<StageHistoryEntry>, AppError> {
        self.customer_repo
            .find_customer(&self.pool, organization_id, customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        self.repo.list_history(customer_id).await
    }
}

/// Troca a etapa do cliente dentro de uma transação aberta.
/// Mesma etapa de destino é no-op: nada é gravado e nenhum evento é gerado.
pub async fn apply_stage_change(
    conn: &mut PgConnection,
    funnel_repo: &FunnelRepository,
    customer_repo: &CustomerRepository,
    customer: &Customer,
    to_stage_id: Option<Uuid>,
    changed_by: Uuid,
) -> Result<Option<(StageHistoryEntry, CrmEvent)>, AppError> {
    let Some(event) = stage_changed_event(customer, to_stage_id) else {
        return Ok(None);
    };

    if let Some(stage_id) = to_stage_id {
        funnel_repo
            .find_stage_in_org(&mut *conn, customer.organization_id, stage_id)
            .await?
            .ok_or(AppError::NotFound("Etapa"))?;
    }

    customer_repo
        .set_stage(&mut *conn, customer.organization_id, customer.id, to_stage_id)
        .await?;
    let entry = funnel_repo
        .insert_history(&mut *conn, customer.id, customer.stage_id, to_stage_id, Some(changed_by))
        .await?;

    Ok(Some((entry, event)))
}

/// Evento da troca de etapa, ou `None` quando o destino é a etapa atual.
fn stage_changed_event(customer: &Customer, to_stage_id: Option<Uuid>) -> Option<CrmEvent> {
    (customer.stage_id != to_stage_id).then(|| CrmEvent::StageChanged {
        organization_id: customer.organization_id,
        customer_id: customer.id,
        from_stage_id: customer.stage_id,
        to_stage_id,
    })
}

/// Agrupa as etapas (já ordenadas) sob seus funis, preservando a ordem dos funis.
pub fn group_stages(funnels: Vec<Funnel>, stages: Vec<Stage>) -> Vec<FunnelWithStages> {
    let mut grouped: Vec<FunnelWithStages> = funnels
        .into_iter()
        .map(|funnel| FunnelWithStages { funnel, stages: Vec::new() })
        .collect();

    for stage in stages {
        if let Some(entry) = grouped.iter_mut().find(|f| f.funnel.id == stage.funnel_id) {
            entry.stages.push(stage);
        }
    }

    for entry in &mut grouped {
        entry.stages.sort_by_key(|s| s.position);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn funnel(name: &str, position: i32) -> Funnel {
        Funnel {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            name: name.to_string(),
            position,
            created_at: Utc::now(),
        }
    }

    fn stage(funnel_id: Uuid, name: &str, position: i32) -> Stage {
        Stage {
            id: Uuid::new_v4(),
            funnel_id,
            name: name.to_string(),
            color: DEFAULT_STAGE_COLOR.to_string(),
            position,
        }
    }

    fn customer_at(stage_id: Option<Uuid>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Roberto Silva".to_string(),
            stage_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn same_stage_produces_no_event() {
        let stage_id = Uuid::new_v4();
        assert!(stage_changed_event(&customer_at(Some(stage_id)), Some(stage_id)).is_none());
        assert!(stage_changed_event(&customer_at(None), None).is_none());
    }

    #[test]
    fn stage_change_event_carries_both_stages() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let customer = customer_at(Some(from));

        let event = stage_changed_event(&customer, Some(to));
        assert!(matches!(
            event,
            Some(CrmEvent::StageChanged { customer_id, from_stage_id: Some(f), to_stage_id: Some(t), .. })
                if customer_id == customer.id && f == from && t == to
        ));
        assert!(matches!(
            stage_changed_event(&customer, None),
            Some(CrmEvent::StageChanged { to_stage_id: None, .. })
        ));
    }

    #[test]
    fn stages_are_grouped_under_their_funnel_by_position() {
        let sales = funnel("Vendas", 0);
        let support = funnel("Pós-venda", 1);
        let stages = vec![
            stage(sales.id, "Fechado", 2),
            stage(support.id, "Aberto", 0),
            stage(sales.id, "Novo contato", 0),
            stage(Uuid::new_v4(), "Órfã", 0),
        ];

        let grouped = group_stages(vec![sales, support], stages);

        assert_eq!(grouped.len(), 2);
        let names: Vec<_> = grouped[0].stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Novo contato", "Fechado"]);
        assert_eq!(grouped[1].stages.len(), 1);
    }
}
