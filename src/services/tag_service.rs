// src/services/tag_service.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        events::{CrmEvent, EventBus},
        keyed_mutex::KeyedMutex,
    },
    db::{CustomerRepository, TagRepository},
    models::customer::{Tag, TagToggleResponse},
};

const DEFAULT_TAG_COLOR: &str = "#3b82f6";

/// Escrita das tags de um cliente.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn attach(&self, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError>;
    async fn detach(&self, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
impl TagStore for TagRepository {
    async fn attach(&self, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError> {
        TagRepository::attach(self, self.pool(), customer_id, tag_id).await
    }

    async fn detach(&self, customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError> {
        TagRepository::detach(self, self.pool(), customer_id, tag_id).await
    }
}

/// Conjunto de tags de um cliente com atualização otimista:
/// a mudança é aplicada localmente e desfeita se a escrita falhar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSelection {
    customer_id: Uuid,
    tag_ids: Vec<Uuid>,
}

impl TagSelection {
    pub fn new(customer_id: Uuid, tag_ids: Vec<Uuid>) -> Self {
        Self { customer_id, tag_ids }
    }

    pub fn tag_ids(&self) -> &[Uuid] {
        &self.tag_ids
    }

    pub fn contains(&self, tag_id: Uuid) -> bool {
        self.tag_ids.contains(&tag_id)
    }

    /// Alterna a tag. Retorna `true` se ela ficou vinculada.
    pub async fn toggle(&mut self, store: &dyn TagStore, tag_id: Uuid) -> Result<bool, AppError> {
        let previous = self.tag_ids.clone();
        let attached = !self.contains(tag_id);

        if attached {
            self.tag_ids.push(tag_id);
        } else {
            self.tag_ids.retain(|id| *id != tag_id);
        }

        let written = if attached {
            store.attach(self.customer_id, tag_id).await
        } else {
            store.detach(self.customer_id, tag_id).await
        };

        if let Err(e) = written {
            tracing::warn!(customer_id = %self.customer_id, %tag_id, "falha ao gravar tag, revertendo: {e}");
            self.tag_ids = previous;
            return Err(e);
        }

        Ok(attached)
    }
}

#[derive(Clone)]
pub struct TagService {
    repo: TagRepository,
    customer_repo: CustomerRepository,
    pool: PgPool,
    events: EventBus,
    mutations: KeyedMutex<Uuid>,
}

impl TagService {
    pub fn new(
        repo: TagRepository,
        customer_repo: CustomerRepository,
        pool: PgPool,
        events: EventBus,
        mutations: KeyedMutex<Uuid>,
    ) -> Self {
        Self { repo, customer_repo, pool, events, mutations }
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Tag>, AppError> {
        self.repo.list_tags(organization_id).await
    }

    pub async fn create(&self, organization_id: Uuid, name: &str, color: Option<&str>) -> Result<Tag, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::NameRequired);
        }
        self.repo
            .create_tag(organization_id, name, color.unwrap_or(DEFAULT_TAG_COLOR))
            .await
    }

    pub async fn delete(&self, organization_id: Uuid, tag_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_tag(organization_id, tag_id).await? {
            return Err(AppError::NotFound("Tag"));
        }
        Ok(())
    }

    /// Alterna a tag no cliente. Toggles simultâneos no mesmo cliente
    /// entram na fila dele e são aplicados um por vez, nenhum é descartado.
    pub async fn toggle(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
        tag_id: Uuid,
    ) -> Result<TagToggleResponse, AppError> {
        let _turn = self.mutations.lock(customer_id).await;

        self.customer_repo
            .find_customer(&self.pool, organization_id, customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        if self.repo.count_in_org(&self.pool, organization_id, &[tag_id]).await? == 0 {
            return Err(AppError::NotFound("Tag"));
        }

        let current = self.repo.tag_ids_for_customer(&self.pool, customer_id).await?;
        let mut selection = TagSelection::new(customer_id, current);
        let attached = selection.toggle(&self.repo, tag_id).await?;

        self.events.publish(CrmEvent::TagToggled { organization_id, customer_id, tag_id, attached });

        Ok(TagToggleResponse {
            customer_id,
            tag_ids: selection.tag_ids().to_vec(),
            attached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Attach(Uuid),
        Detach(Uuid),
    }

    #[derive(Default)]
    struct FakeStore {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    #[async_trait]
    impl TagStore for FakeStore {
        async fn attach(&self, _customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::Attach(tag_id));
            if self.fail {
                return Err(AppError::InternalServerError(anyhow::anyhow!("offline")));
            }
            Ok(())
        }

        async fn detach(&self, _customer_id: Uuid, tag_id: Uuid) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::Detach(tag_id));
            if self.fail {
                return Err(AppError::InternalServerError(anyhow::anyhow!("offline")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn toggling_twice_restores_the_original_set() {
        let store = FakeStore::default();
        let existing = Uuid::new_v4();
        let added = Uuid::new_v4();
        let mut selection = TagSelection::new(Uuid::new_v4(), vec![existing]);

        assert!(selection.toggle(&store, added).await.unwrap());
        assert!(!selection.toggle(&store, added).await.unwrap());

        assert_eq!(selection.tag_ids(), &[existing]);
        assert_eq!(*store.calls.lock().unwrap(), vec![Call::Attach(added), Call::Detach(added)]);
    }

    #[tokio::test]
    async fn failed_write_rolls_back_local_change() {
        let store = FakeStore { fail: true, ..Default::default() };
        let existing = Uuid::new_v4();
        let mut selection = TagSelection::new(Uuid::new_v4(), vec![existing]);

        assert!(selection.toggle(&store, Uuid::new_v4()).await.is_err());
        assert_eq!(selection.tag_ids(), &[existing]);

        assert!(selection.toggle(&store, existing).await.is_err());
        assert!(selection.contains(existing));
    }

    #[tokio::test]
    async fn concurrent_toggles_on_one_customer_are_serialised() {
        use std::sync::Arc;

        let mutations = KeyedMutex::<Uuid>::new();
        let customer_id = Uuid::new_v4();
        let tag_id = Uuid::new_v4();
        let store = Arc::new(FakeStore::default());
        let shared = Arc::new(tokio::sync::Mutex::new(TagSelection::new(customer_id, Vec::new())));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let mutations = mutations.clone();
            let store = Arc::clone(&store);
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(async move {
                let _turn = mutations.lock(customer_id).await;
                let mut selection = shared.lock().await.clone();
                tokio::task::yield_now().await;
                selection.toggle(store.as_ref(), tag_id).await.unwrap();
                *shared.lock().await = selection;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Quatro toggles aplicados em sequência: volta ao estado inicial
        assert!(shared.lock().await.tag_ids().is_empty());
        let calls = store.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![Call::Attach(tag_id), Call::Detach(tag_id), Call::Attach(tag_id), Call::Detach(tag_id)]
        );
    }
}
