//! Entity traits defining the core abstraction for all persisted records

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::field::FieldValue;

/// Identifier types usable as entity keys.
///
/// Stores rely on `generate` to assign ids to new entities. The sequence
/// number is monotonic per store and starts at 1.
pub trait Identifier:
    Clone
    + Debug
    + Display
    + FromStr
    + Eq
    + Ord
    + Hash
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Produce the id for the `seq`-th entity created in a store
    fn generate(seq: u64) -> Self;
}

impl Identifier for i64 {
    fn generate(seq: u64) -> Self {
        seq as i64
    }
}

impl Identifier for u64 {
    fn generate(seq: u64) -> Self {
        seq
    }
}

impl Identifier for Uuid {
    fn generate(_seq: u64) -> Self {
        Uuid::new_v4()
    }
}

impl Identifier for String {
    fn generate(_seq: u64) -> Self {
        Uuid::new_v4().to_string()
    }
}

/// Base trait for all entities in the system.
///
/// An entity is a persisted record identified by a typed identifier. A `None`
/// id means the entity has not been stored yet; saving it assigns one.
///
/// Two entities are the same record when their ids are equal, see
/// [`Entity::same_identity`].
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier type
    type Id: Identifier;

    /// The resource name used in logs and errors (e.g., "plugin_config")
    fn resource_name() -> &'static str;

    /// Get the identifier, `None` for entities that were never saved
    fn id(&self) -> Option<Self::Id>;

    /// Assign the identifier
    fn set_id(&mut self, id: Self::Id);

    /// Get the value of a field by name, used for predicates and sorting
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Values that must be unique across the store, as `(constraint, value)`
    ///
    /// Stores reject a save that would duplicate any of these with an
    /// integrity error. No constraints by default.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Check whether the entity has been persisted
    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Identity equality: both saved and carrying the same id
    fn same_identity(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
