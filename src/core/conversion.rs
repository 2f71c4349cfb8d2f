//! String to typed-value conversion used by the attribute binder
//!
//! Converters are async because entity converters load from a store.

use futures::future::{BoxFuture, FutureExt};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::{BindingError, PlinthError, PlinthResult};
use crate::core::service::EntityService;

type Converted = Box<dyn Any + Send>;
type Converter = Arc<dyn Fn(String) -> BoxFuture<'static, PlinthResult<Converted>> + Send + Sync>;

/// Registry of `String -> T` converters keyed by target type
#[derive(Default, Clone)]
pub struct ConversionService {
    converters: HashMap<TypeId, Converter>,
}

impl ConversionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a converter that parses with `FromStr`
    pub fn register_parse<T>(&mut self)
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        let converter: Converter = Arc::new(|value: String| {
            async move {
                value
                    .parse::<T>()
                    .map(|parsed| Box::new(parsed) as Converted)
                    .map_err(|e| {
                        BindingError::InvalidValue {
                            attribute: short_type_name::<T>().to_string(),
                            value,
                            message: e.to_string(),
                        }
                        .into()
                    })
            }
            .boxed()
        });
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    /// Install a converter that loads an entity by its string id
    ///
    /// An unparsable id is `BindingError::InvalidValue`, a missing entity
    /// `BindingError::NotFound`.
    pub fn register_entity<T: Entity>(&mut self, service: EntityService<T>) {
        let converter: Converter = Arc::new(move |value: String| {
            let service = service.clone();
            async move {
                let id = value.trim().parse::<T::Id>().map_err(|_| {
                    PlinthError::from(BindingError::InvalidValue {
                        attribute: T::resource_name().to_string(),
                        value: value.clone(),
                        message: format!("not a valid {} id", T::resource_name()),
                    })
                })?;

                match service.find_one(&id).await? {
                    Some(entity) => Ok(Box::new(entity) as Converted),
                    None => Err(BindingError::NotFound {
                        resource: T::resource_name().to_string(),
                        id: id.to_string(),
                    }
                    .into()),
                }
            }
            .boxed()
        });
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    /// Builder-style variant of [`register_entity`](Self::register_entity)
    pub fn with_entity<T: Entity>(mut self, service: EntityService<T>) -> Self {
        self.register_entity(service);
        self
    }

    pub fn can_convert<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// Convert `value` to `T`
    pub async fn convert<T: 'static>(&self, value: &str) -> PlinthResult<T> {
        let converter =
            self.converters
                .get(&TypeId::of::<T>())
                .ok_or_else(|| BindingError::NoConverter {
                    type_name: type_name::<T>().to_string(),
                })?;

        let converted = converter(value.to_string()).await?;
        converted
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| PlinthError::Internal(format!("converter for {} returned another type", type_name::<T>())))
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
