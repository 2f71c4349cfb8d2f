//! Core module containing fundamental traits and types for the framework

pub mod binder;
pub mod conversion;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod field;
pub mod query;
pub mod registry;
pub mod result;
pub mod service;
pub mod store;

pub use binder::{AttributeBinder, BindTarget, RequestValues};
pub use conversion::ConversionService;
pub use entity::{Entity, Identifier};
pub use error::{
    BindingError, ConfigError, EntityError, FieldValidationError, PlinthError, PlinthResult,
    StorageError, ValidationError,
};
pub use extractors::ModelAttribute;
pub use field::{FieldFormat, FieldValue};
pub use query::{Direction, Order, Page, PageRequest, PaginationMeta, Predicate, Sort};
pub use registry::EntityServiceRegistry;
pub use result::ResultEnvelope;
pub use service::{EntityFactory, EntityService};
pub use store::EntityStore;
