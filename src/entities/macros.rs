//! Macros for reducing boilerplate when defining entities
//!
//! These generate the `Entity` and `BindTarget` implementations for structs
//! that keep their key in an `id: Option<Id>` field.

/// Implement `Entity` for a struct with an `id: Option<$id>` field
///
/// Listed fields are readable by predicates and sorts under their Rust
/// names; `unique` fields become store-level unique keys.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// pub struct Article {
///     pub id: Option<i64>,
///     pub slug: String,
///     pub title: String,
///     pub views: i64,
/// }
///
/// impl_entity!(Article, i64, "article", [slug, title, views], unique = [slug]);
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident, $id:ty, $resource:literal, [$($field:ident),* $(,)?]
        $(, unique = [$($key:ident),* $(,)?])?
    ) => {
        impl $crate::core::entity::Entity for $type {
            type Id = $id;

            fn resource_name() -> &'static str {
                $resource
            }

            fn id(&self) -> Option<$id> {
                self.id.clone()
            }

            fn set_id(&mut self, id: $id) {
                self.id = Some(id);
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    $(
                        stringify!($field) => Some($crate::core::field::FieldValue::from_json(
                            &::serde_json::to_value(&self.$field)
                                .unwrap_or(::serde_json::Value::Null),
                        )),
                    )*
                    _ => None,
                }
            }

            $(
                fn unique_keys(&self) -> Vec<(&'static str, String)> {
                    vec![$((stringify!($key), self.$key.to_string())),*]
                }
            )?
        }
    };
}

/// Make an entity bindable as a `ModelAttribute` named `$attribute`
///
/// Requests without a source start from the registered service's blank
/// entity; an `id` parameter loads the stored one.
///
/// # Example
/// ```rust,ignore
/// impl_entity_attribute!(Article, "article");
/// ```
#[macro_export]
macro_rules! impl_entity_attribute {
    ($type:ident, $attribute:literal) => {
        impl $crate::core::binder::BindTarget for $type {
            const IS_ENTITY: bool = true;

            fn attribute_name() -> &'static str {
                $attribute
            }

            fn new_blank(
                services: &$crate::core::registry::EntityServiceRegistry,
            ) -> $crate::core::error::PlinthResult<Self> {
                services.new_entity::<Self>()
            }
        }
    };
}
