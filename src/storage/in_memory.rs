//! In-memory implementation of EntityStore for testing and development

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::entity::{Entity, Identifier};
use crate::core::error::{EntityError, PlinthResult, StorageError};
use crate::core::query::{Page, PageRequest, Predicate, Sort};
use crate::core::store::EntityStore;

struct Table<T: Entity> {
    rows: BTreeMap<T::Id, T>,
    next_seq: u64,
}

impl<T: Entity> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            next_seq: self.next_seq,
        }
    }
}

impl<T: Entity> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_seq: 1,
        }
    }

    fn next_id(&mut self) -> T::Id {
        loop {
            let id = <T::Id as Identifier>::generate(self.next_seq);
            self.next_seq += 1;
            if !self.rows.contains_key(&id) {
                return id;
            }
        }
    }

    fn put(&mut self, mut entity: T) -> PlinthResult<T> {
        let existing_id = entity.id();

        for (constraint, value) in entity.unique_keys() {
            let clash = self.rows.iter().any(|(id, row)| {
                Some(id) != existing_id.as_ref()
                    && row
                        .unique_keys()
                        .iter()
                        .any(|(c, v)| *c == constraint && *v == value)
            });
            if clash {
                return Err(StorageError::IntegrityError {
                    resource: T::resource_name().to_string(),
                    constraint: constraint.to_string(),
                    value,
                }
                .into());
            }
        }

        let id = match existing_id {
            Some(id) => id,
            None => {
                let id = self.next_id();
                entity.set_id(id.clone());
                id
            }
        };

        self.rows.insert(id, entity.clone());
        Ok(entity)
    }

    fn matching(&self, predicate: &Predicate, sort: &Sort) -> Vec<T> {
        let mut data: Vec<T> = self
            .rows
            .values()
            .filter(|row| predicate.matches(*row))
            .cloned()
            .collect();
        sort.apply(&mut data);
        data
    }
}

/// In-memory entity store
///
/// Useful for testing and development. Uses a tokio RwLock; unique keys are
/// checked inside the write lock so concurrent saves cannot both succeed.
pub struct InMemoryEntityStore<T: Entity> {
    table: Arc<RwLock<Table<T>>>,
}

impl<T: Entity> Clone for InMemoryEntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Entity> InMemoryEntityStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table::new())),
        }
    }
}

impl<T: Entity> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryEntityStore<T> {
    async fn save(&self, entity: T) -> PlinthResult<T> {
        let mut table = self.table.write().await;
        table.put(entity)
    }

    async fn update(&self, entity: T) -> PlinthResult<T> {
        let mut table = self.table.write().await;
        match entity.id() {
            Some(id) if table.rows.contains_key(&id) => table.put(entity),
            id => Err(EntityError::NotFound {
                resource: T::resource_name().to_string(),
                id: id.map(|id| id.to_string()).unwrap_or_default(),
            }
            .into()),
        }
    }

    async fn save_all(&self, entities: Vec<T>) -> PlinthResult<Vec<T>> {
        let mut table = self.table.write().await;
        let mut staged = table.clone();

        let saved = entities
            .into_iter()
            .map(|entity| staged.put(entity))
            .collect::<PlinthResult<Vec<T>>>()?;

        *table = staged;
        Ok(saved)
    }

    async fn delete_by_id(&self, id: &T::Id) -> PlinthResult<()> {
        self.table.write().await.rows.remove(id);
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[T::Id]) -> PlinthResult<()> {
        let mut table = self.table.write().await;
        for id in ids {
            table.rows.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> PlinthResult<()> {
        self.table.write().await.rows.clear();
        Ok(())
    }

    async fn find_one(&self, id: &T::Id) -> PlinthResult<Option<T>> {
        Ok(self.table.read().await.rows.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[T::Id]) -> PlinthResult<Vec<T>> {
        let table = self.table.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| table.rows.get(id).cloned())
            .collect())
    }

    async fn find_matching(&self, predicate: &Predicate, sort: &Sort) -> PlinthResult<Vec<T>> {
        Ok(self.table.read().await.matching(predicate, sort))
    }

    async fn find_page(
        &self,
        predicate: &Predicate,
        request: &PageRequest,
    ) -> PlinthResult<Page<T>> {
        let data = self.table.read().await.matching(predicate, &request.sort);
        Ok(Page::from_sorted(data, request))
    }

    async fn count_matching(&self, predicate: &Predicate) -> PlinthResult<u64> {
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|row| predicate.matches(*row)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlinthError;
    use crate::core::field::FieldValue;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Tag {
        id: Option<i64>,
        slug: String,
        weight: i64,
    }

    impl Tag {
        fn new(slug: &str, weight: i64) -> Self {
            Self {
                id: None,
                slug: slug.to_string(),
                weight,
            }
        }
    }

    impl Entity for Tag {
        type Id = i64;

        fn resource_name() -> &'static str {
            "tag"
        }

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "slug" => Some(FieldValue::String(self.slug.clone())),
                "weight" => Some(FieldValue::Integer(self.weight)),
                _ => None,
            }
        }

        fn unique_keys(&self) -> Vec<(&'static str, String)> {
            vec![("slug", self.slug.clone())]
        }
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let store = InMemoryEntityStore::<Tag>::new();
        let a = store.save(Tag::new("a", 1)).await.unwrap();
        let b = store.save(Tag::new("b", 2)).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
    }

    #[tokio::test]
    async fn test_save_updates_existing() {
        let store = InMemoryEntityStore::<Tag>::new();
        let mut tag = store.save(Tag::new("a", 1)).await.unwrap();
        tag.weight = 9;
        store.save(tag.clone()).await.unwrap();

        let found = store.find_one(&1).await.unwrap().unwrap();
        assert_eq!(found.weight, 9);
        assert_eq!(store.count_matching(&Predicate::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_key_rejected() {
        let store = InMemoryEntityStore::<Tag>::new();
        store.save(Tag::new("a", 1)).await.unwrap();

        let err = store.save(Tag::new("a", 2)).await.unwrap_err();
        assert!(err.is_integrity_violation());
        assert_eq!(store.count_matching(&Predicate::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_all_is_atomic() {
        let store = InMemoryEntityStore::<Tag>::new();
        let result = store
            .save_all(vec![Tag::new("a", 1), Tag::new("b", 2), Tag::new("a", 3)])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count_matching(&Predicate::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manual_id_skipped_by_sequence() {
        let store = InMemoryEntityStore::<Tag>::new();
        let mut manual = Tag::new("manual", 0);
        manual.set_id(1);
        store.save(manual).await.unwrap();

        let generated = store.save(Tag::new("auto", 0)).await.unwrap();
        assert_eq!(generated.id, Some(2));
    }

    #[tokio::test]
    async fn test_update_never_recreates_deleted_row() {
        let store = InMemoryEntityStore::<Tag>::new();
        let mut saved = store.save(Tag::new("rust", 1)).await.unwrap();
        saved.weight = 2;
        assert_eq!(store.update(saved.clone()).await.unwrap().weight, 2);

        store.delete_by_id(&1).await.unwrap();
        let err = store.update(saved).await.unwrap_err();
        assert!(matches!(err, PlinthError::Entity(EntityError::NotFound { .. })));
        assert!(store.find_one(&1).await.unwrap().is_none());

        let unsaved = store.update(Tag::new("new", 0)).await.unwrap_err();
        assert_eq!(unsaved.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_is_silent() {
        let store = InMemoryEntityStore::<Tag>::new();
        store.delete_by_id(&42).await.unwrap();
        assert!(store.find_one(&42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_page_sorted_and_filtered() {
        let store = InMemoryEntityStore::<Tag>::new();
        for (slug, weight) in [("a", 5), ("b", 1), ("c", 3), ("d", 4), ("e", 0)] {
            store.save(Tag::new(slug, weight)).await.unwrap();
        }

        let predicate = Predicate::all().gt("weight", FieldValue::Integer(0));
        let request = PageRequest::new(1, 2).with_sort(Sort::desc("weight"));
        let page = store.find_page(&predicate, &request).await.unwrap();

        let slugs: Vec<&str> = page.content.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "d"]);
        assert_eq!(page.pagination.total, 4);
        assert!(page.pagination.has_next);
    }
}
