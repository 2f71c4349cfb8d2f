//! Registry mapping entity types to their services
//!
//! Built once at startup and shared as router state. Lookups are keyed by
//! `TypeId`, so resolving a service never inspects generic declarations.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::{ConfigError, PlinthResult};
use crate::core::service::EntityService;

struct Registration {
    resource: &'static str,
    service: Arc<dyn Any + Send + Sync>,
}

/// Entity type to [`EntityService`] lookup
#[derive(Default)]
pub struct EntityServiceRegistry {
    services: HashMap<TypeId, Registration>,
}

impl EntityServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the service for `T`, replacing any previous one
    pub fn register<T: Entity>(&mut self, service: EntityService<T>) {
        tracing::debug!(resource = T::resource_name(), "entity service registered");
        self.services.insert(
            TypeId::of::<T>(),
            Registration {
                resource: T::resource_name(),
                service: Arc::new(service),
            },
        );
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with<T: Entity>(mut self, service: EntityService<T>) -> Self {
        self.register(service);
        self
    }

    /// The service registered for `T`
    pub fn get<T: Entity>(&self) -> Option<EntityService<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|r| r.service.downcast_ref::<EntityService<T>>())
            .cloned()
    }

    /// The service registered for `T`, or a configuration error
    pub fn require<T: Entity>(&self) -> PlinthResult<EntityService<T>> {
        self.get::<T>().ok_or_else(|| {
            ConfigError::UnregisteredService {
                type_name: type_name::<T>().to_string(),
            }
            .into()
        })
    }

    /// A blank entity from the registered service's factory
    pub fn new_entity<T: Entity>(&self) -> PlinthResult<T> {
        Ok(self.require::<T>()?.new_entity())
    }

    pub fn contains<T: Entity>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Resource names of all registered services, sorted
    pub fn resources(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.values().map(|r| r.resource).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlinthError;
    use crate::core::field::FieldValue;
    use crate::storage::InMemoryEntityStore;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Page {
        id: Option<u64>,
        slug: String,
    }

    impl Entity for Page {
        type Id = u64;

        fn resource_name() -> &'static str {
            "page"
        }

        fn id(&self) -> Option<u64> {
            self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "slug" => Some(FieldValue::String(self.slug.clone())),
                _ => None,
            }
        }
    }

    fn page_service() -> EntityService<Page> {
        EntityService::with_factory(InMemoryEntityStore::<Page>::new(), || Page {
            id: None,
            slug: "draft".to_string(),
        })
    }

    #[test]
    fn test_new_entity_uses_registered_factory() {
        let registry = EntityServiceRegistry::new().with(page_service());
        let blank: Page = registry.new_entity().unwrap();
        assert_eq!(blank.slug, "draft");
        assert!(blank.id.is_none());
        assert_eq!(registry.resources(), vec!["page"]);
    }

    #[test]
    fn test_unregistered_type_is_config_error() {
        let registry = EntityServiceRegistry::new();
        assert!(!registry.contains::<Page>());

        let err = registry.new_entity::<Page>().unwrap_err();
        match err {
            PlinthError::Config(ConfigError::UnregisteredService { type_name }) => {
                assert!(type_name.ends_with("Page"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registered_service_shares_store() {
        let service = page_service();
        let registry = EntityServiceRegistry::new().with(service.clone());

        let saved = service
            .save(Page {
                id: None,
                slug: "about".into(),
            })
            .await
            .unwrap();

        let found = registry
            .require::<Page>()
            .unwrap()
            .find_one(&saved.id.unwrap())
            .await
            .unwrap();
        assert_eq!(found, Some(saved));
    }
}
