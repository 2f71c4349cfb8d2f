//! The entity store contract consumed by entity services
//!
//! Implementations own persistence; the framework is agnostic to the
//! underlying storage mechanism. Every method is one atomic unit of work.

use async_trait::async_trait;

use crate::core::entity::Entity;
use crate::core::error::PlinthResult;
use crate::core::query::{Page, PageRequest, Predicate, Sort};

/// Persistence interface keyed by the entity's identifier type
///
/// Contract:
/// - `save` creates when the id is `None` (the store assigns one) and
///   updates otherwise; it enforces [`Entity::unique_keys`] and fails with
///   `StorageError::IntegrityError` on a duplicate.
/// - `update` only replaces an existing row; it fails with
///   `EntityError::NotFound` when the id is unset or no longer stored.
/// - `find_one` returns `None` for a missing id, never an error.
/// - deleting a missing id or entity returns silently.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Create or update one entity, returning it with its id assigned
    async fn save(&self, entity: T) -> PlinthResult<T>;

    /// Replace a stored entity, never recreating a deleted one
    async fn update(&self, entity: T) -> PlinthResult<T>;

    /// Create or update several entities; all or nothing
    async fn save_all(&self, entities: Vec<T>) -> PlinthResult<Vec<T>>;

    /// Save and force pending writes to the backend
    ///
    /// Stores without write buffering can rely on the default.
    async fn save_and_flush(&self, entity: T) -> PlinthResult<T> {
        let saved = self.save(entity).await?;
        self.flush().await?;
        Ok(saved)
    }

    /// Push buffered writes to the backend
    async fn flush(&self) -> PlinthResult<()> {
        Ok(())
    }

    /// Delete by id
    async fn delete_by_id(&self, id: &T::Id) -> PlinthResult<()>;

    /// Delete several ids at once
    async fn delete_by_ids(&self, ids: &[T::Id]) -> PlinthResult<()>;

    /// Delete every entity
    async fn delete_all(&self) -> PlinthResult<()>;

    /// Find by id
    async fn find_one(&self, id: &T::Id) -> PlinthResult<Option<T>>;

    /// Find the entities whose ids are listed; missing ids are skipped
    async fn find_by_ids(&self, ids: &[T::Id]) -> PlinthResult<Vec<T>>;

    /// Find every entity matching the predicate, in sort order
    async fn find_matching(&self, predicate: &Predicate, sort: &Sort) -> PlinthResult<Vec<T>>;

    /// Find one page of entities matching the predicate
    async fn find_page(&self, predicate: &Predicate, request: &PageRequest)
    -> PlinthResult<Page<T>>;

    /// Count entities matching the predicate
    async fn count_matching(&self, predicate: &Predicate) -> PlinthResult<u64>;
}
