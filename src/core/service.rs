//! Generic business-logic facade over an entity store

use std::fmt;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::{EntityError, PlinthResult};
use crate::core::query::{Page, PageRequest, Predicate, Sort};
use crate::core::store::EntityStore;

/// Function producing a blank entity
pub type EntityFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Service for one entity type
///
/// The entity type is fixed by the type parameter and the blank-entity
/// factory is handed in at construction, so a service is complete as soon as
/// it exists. Cloning is cheap and shares the store.
///
/// # Example
///
/// ```rust,ignore
/// let service = EntityService::new(InMemoryEntityStore::<Article>::new());
/// let mut article = service.new_entity();
/// article.title = "Hello".to_string();
/// let saved = service.save(article).await?;
/// assert!(service.exists(&saved.id().unwrap()).await?);
/// ```
pub struct EntityService<T: Entity> {
    store: Arc<dyn EntityStore<T>>,
    factory: EntityFactory<T>,
}

impl<T: Entity> Clone for EntityService<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<T: Entity> fmt::Debug for EntityService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityService")
            .field("resource", &T::resource_name())
            .finish()
    }
}

impl<T: Entity + Default> EntityService<T> {
    /// Create a service whose blank entities come from `T::default()`
    pub fn new(store: impl EntityStore<T> + 'static) -> Self {
        Self::from_arc(Arc::new(store), Arc::new(T::default))
    }
}

impl<T: Entity> EntityService<T> {
    /// Create a service with an explicit blank-entity factory
    pub fn with_factory(
        store: impl EntityStore<T> + 'static,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self::from_arc(Arc::new(store), Arc::new(factory))
    }

    /// Create a service over a shared store
    pub fn from_arc(store: Arc<dyn EntityStore<T>>, factory: EntityFactory<T>) -> Self {
        Self { store, factory }
    }

    /// The resource name of the managed entity type
    pub fn resource_name(&self) -> &'static str {
        T::resource_name()
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn EntityStore<T>> {
        &self.store
    }

    /// A freshly constructed blank entity (no id)
    pub fn new_entity(&self) -> T {
        (self.factory)()
    }

    // === Writes ===

    /// Create or update an entity
    pub async fn save(&self, entity: T) -> PlinthResult<T> {
        let creating = entity.is_new();
        let saved = self.store.save(entity).await?;
        tracing::debug!(
            resource = T::resource_name(),
            id = ?saved.id(),
            created = creating,
            "entity saved"
        );
        Ok(saved)
    }

    /// Replace a stored entity; `EntityError::NotFound` when it is gone
    pub async fn update(&self, entity: T) -> PlinthResult<T> {
        let updated = self.store.update(entity).await?;
        tracing::debug!(resource = T::resource_name(), id = ?updated.id(), "entity updated");
        Ok(updated)
    }

    /// Create or update several entities in one unit of work
    pub async fn save_all(&self, entities: Vec<T>) -> PlinthResult<Vec<T>> {
        let saved = self.store.save_all(entities).await?;
        tracing::debug!(
            resource = T::resource_name(),
            count = saved.len(),
            "entities saved"
        );
        Ok(saved)
    }

    /// Create or update an entity and flush pending writes
    pub async fn save_and_flush(&self, entity: T) -> PlinthResult<T> {
        let saved = self.store.save_and_flush(entity).await?;
        tracing::debug!(resource = T::resource_name(), id = ?saved.id(), "entity saved and flushed");
        Ok(saved)
    }

    /// Delete by id; a missing id is not an error
    pub async fn delete_by_id(&self, id: &T::Id) -> PlinthResult<()> {
        self.store.delete_by_id(id).await?;
        tracing::debug!(resource = T::resource_name(), %id, "entity deleted");
        Ok(())
    }

    /// Delete an entity; unsaved entities are ignored
    pub async fn delete(&self, entity: &T) -> PlinthResult<()> {
        match entity.id() {
            Some(id) => self.delete_by_id(&id).await,
            None => Ok(()),
        }
    }

    /// Delete several entities one by one
    pub async fn delete_all(&self, entities: &[T]) -> PlinthResult<()> {
        for entity in entities {
            self.delete(entity).await?;
        }
        Ok(())
    }

    /// Delete several entities in a single store operation
    pub async fn delete_in_batch(&self, entities: &[T]) -> PlinthResult<()> {
        let ids: Vec<T::Id> = entities.iter().filter_map(Entity::id).collect();
        self.store.delete_by_ids(&ids).await?;
        tracing::debug!(
            resource = T::resource_name(),
            count = ids.len(),
            "entities deleted in batch"
        );
        Ok(())
    }

    /// Delete every entity in a single store operation
    pub async fn delete_all_in_batch(&self) -> PlinthResult<()> {
        self.store.delete_all().await?;
        tracing::debug!(resource = T::resource_name(), "all entities deleted");
        Ok(())
    }

    // === Reads ===

    /// Find by id, `None` when missing
    pub async fn find_one(&self, id: &T::Id) -> PlinthResult<Option<T>> {
        self.store.find_one(id).await
    }

    /// Fetch by id, failing with `EntityError::NotFound` when missing
    ///
    /// The lookup is eager: the error surfaces here, never on later access.
    pub async fn get_one(&self, id: &T::Id) -> PlinthResult<T> {
        self.store.find_one(id).await?.ok_or_else(|| {
            EntityError::NotFound {
                resource: T::resource_name().to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    pub async fn exists(&self, id: &T::Id) -> PlinthResult<bool> {
        Ok(self.store.find_one(id).await?.is_some())
    }

    pub async fn count(&self) -> PlinthResult<u64> {
        self.store.count_matching(&Predicate::all()).await
    }

    pub async fn find_all(&self) -> PlinthResult<Vec<T>> {
        self.store
            .find_matching(&Predicate::all(), &Sort::unsorted())
            .await
    }

    pub async fn find_all_by_ids(&self, ids: &[T::Id]) -> PlinthResult<Vec<T>> {
        self.store.find_by_ids(ids).await
    }

    pub async fn find_all_sorted(&self, sort: &Sort) -> PlinthResult<Vec<T>> {
        self.store.find_matching(&Predicate::all(), sort).await
    }

    pub async fn find_all_paged(&self, request: &PageRequest) -> PlinthResult<Page<T>> {
        self.store.find_page(&Predicate::all(), request).await
    }

    /// First entity matching the predicate, if any
    pub async fn find_one_matching(&self, predicate: &Predicate) -> PlinthResult<Option<T>> {
        let mut found = self
            .store
            .find_matching(predicate, &Sort::unsorted())
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    pub async fn find_all_matching(&self, predicate: &Predicate) -> PlinthResult<Vec<T>> {
        self.store.find_matching(predicate, &Sort::unsorted()).await
    }

    pub async fn find_all_matching_sorted(
        &self,
        predicate: &Predicate,
        sort: &Sort,
    ) -> PlinthResult<Vec<T>> {
        self.store.find_matching(predicate, sort).await
    }

    pub async fn find_all_matching_paged(
        &self,
        predicate: &Predicate,
        request: &PageRequest,
    ) -> PlinthResult<Page<T>> {
        self.store.find_page(predicate, request).await
    }

    pub async fn count_matching(&self, predicate: &Predicate) -> PlinthResult<u64> {
        self.store.count_matching(predicate).await
    }

    pub async fn exists_matching(&self, predicate: &Predicate) -> PlinthResult<bool> {
        Ok(self.store.count_matching(predicate).await? > 0)
    }
}
