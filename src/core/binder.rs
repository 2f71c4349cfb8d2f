//! Attribute binder: resolves the initial object of a handler argument
//! and binds request values onto it
//!
//! Resolution order for an attribute named `name` of type `T`:
//!
//! 1. a non-blank path variable called `name`
//! 2. otherwise a non-blank request parameter called `name`
//! 3. a source from 1 or 2 is converted when a `String -> T` converter is
//!    registered, and falls through to 5 when none is
//! 4. with no source, entity targets load the entity named by a non-blank
//!    `id` parameter, or start from a blank entity of the registered service
//! 5. anything else starts from `T::default()`
//!
//! The binding pass then overlays request parameters and the JSON body.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::conversion::ConversionService;
use crate::core::error::{BindingError, PlinthResult};
use crate::core::registry::EntityServiceRegistry;

/// A type that request handlers receive as a bound attribute
pub trait BindTarget: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Entity targets honour the `id` parameter and the registered factory
    const IS_ENTITY: bool = false;

    /// Name looked up in path variables, parameters and the JSON body
    fn attribute_name() -> &'static str;

    /// Starting object when the request names no source
    ///
    /// Entity targets override this to use their registered factory.
    fn new_blank(_services: &EntityServiceRegistry) -> PlinthResult<Self> {
        Ok(Self::default())
    }
}

/// Raw request values available to the binder
#[derive(Debug, Clone, Default)]
pub struct RequestValues {
    pub path: HashMap<String, String>,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path variable by name, `None` when absent or blank
    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str).filter(|v| has_text(v))
    }

    /// First request parameter by name, `None` when absent or blank
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|v| has_text(v))
    }
}

fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolves and binds handler attributes
#[derive(Clone)]
pub struct AttributeBinder {
    conversions: Arc<ConversionService>,
    services: Arc<EntityServiceRegistry>,
}

impl AttributeBinder {
    pub fn new(conversions: Arc<ConversionService>, services: Arc<EntityServiceRegistry>) -> Self {
        Self {
            conversions,
            services,
        }
    }

    pub fn conversions(&self) -> &ConversionService {
        &self.conversions
    }

    pub fn services(&self) -> &EntityServiceRegistry {
        &self.services
    }

    /// Resolve then bind, the full extractor pipeline
    pub async fn bind_attribute<T: BindTarget>(
        &self,
        name: &str,
        values: &RequestValues,
    ) -> PlinthResult<T> {
        let target = self.resolve::<T>(name, values).await?;
        self.bind(target, name, values)
    }

    /// Produce the starting object without binding request values
    pub async fn resolve<T: BindTarget>(&self, name: &str, values: &RequestValues) -> PlinthResult<T> {
        match values.path_value(name).or_else(|| values.param(name)) {
            Some(source) => {
                if self.conversions.can_convert::<T>() {
                    return self.conversions.convert::<T>(source).await;
                }
            }
            None if T::IS_ENTITY => {
                return match values.param("id") {
                    Some(id) => self.conversions.convert::<T>(id).await,
                    None => T::new_blank(&self.services),
                };
            }
            None => {}
        }
        Ok(T::default())
    }

    /// Overlay request parameters and the JSON body onto `target`
    ///
    /// Parameters set top-level fields by name, or entries of map fields via
    /// `field[key]` and `field.key`. Values are coerced to the JSON type the
    /// field already holds. Fields holding `null` or an array take the
    /// first reading of the raw text that `T` accepts: string, then number,
    /// then boolean. Repeated parameters fill array fields in order. Unknown
    /// names are ignored.
    pub fn bind<T: BindTarget>(&self, target: T, name: &str, values: &RequestValues) -> PlinthResult<T> {
        let mut state = serde_json::to_value(&target)?;

        let open = match &mut state {
            Value::Object(fields) => bind_parameters(fields, &values.params)?,
            _ => Vec::new(),
        };
        for field in &open {
            settle::<T>(&mut state, field);
        }

        if let (Value::Object(fields), Some(body)) = (&mut state, &values.body) {
            let source = match body.get(name) {
                Some(nested) if nested.is_object() => nested,
                _ => body,
            };
            if let Value::Object(incoming) = source {
                for (key, value) in incoming {
                    if fields.contains_key(key) {
                        fields.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        serde_json::from_value(state).map_err(|e| {
            BindingError::InvalidBody {
                message: format!("cannot bind '{}': {}", name, e),
            }
            .into()
        })
    }
}

/// A parameter whose JSON type the current field value does not reveal
#[derive(Debug, PartialEq)]
struct OpenField {
    name: String,
    raws: Vec<String>,
    array: bool,
}

impl OpenField {
    /// Readings of the raw text, most literal first
    fn candidates(&self) -> Vec<Value> {
        let strings = || self.raws.iter().map(|raw| Value::String(raw.clone()));
        let numbers = || {
            self.raws
                .iter()
                .map(|raw| parse_number(raw))
                .collect::<Option<Vec<_>>>()
        };
        let bools = || {
            self.raws
                .iter()
                .map(|raw| parse_bool(raw).filter(|_| !raw.trim().is_empty()).map(Value::Bool))
                .collect::<Option<Vec<_>>>()
        };

        if self.array {
            let mut out = vec![Value::Array(strings().collect())];
            out.extend(numbers().map(Value::Array));
            out.extend(bools().map(Value::Array));
            out
        } else {
            let mut out: Vec<Value> = strings().collect();
            out.extend(numbers().into_iter().flatten());
            out.extend(bools().into_iter().flatten());
            out
        }
    }
}

/// Write the first candidate `T` deserializes with, else the literal string
fn settle<T: BindTarget>(state: &mut Value, field: &OpenField) {
    let candidates = field.candidates();
    let chosen = candidates
        .iter()
        .find(|candidate| {
            let mut trial = state.clone();
            if let Some(fields) = trial.as_object_mut() {
                fields.insert(field.name.clone(), (*candidate).clone());
            }
            serde_json::from_value::<T>(trial).is_ok()
        })
        .or_else(|| candidates.first());

    if let (Some(fields), Some(value)) = (state.as_object_mut(), chosen) {
        fields.insert(field.name.clone(), value.clone());
    }
}

fn bind_parameters(
    fields: &mut Map<String, Value>,
    params: &[(String, String)],
) -> PlinthResult<Vec<OpenField>> {
    let mut open: Vec<OpenField> = Vec::new();

    for (key, raw) in params {
        if let Some((field, entry)) = split_map_key(key) {
            if let Some(Value::Object(map)) = fields.get_mut(field) {
                map.insert(entry.to_string(), Value::String(raw.clone()));
            }
            continue;
        }

        let Some(current) = fields.get_mut(key.as_str()) else {
            continue;
        };
        match current {
            Value::Array(_) => match open.iter_mut().find(|f| f.array && f.name == *key) {
                Some(field) => field.raws.push(raw.clone()),
                None => open.push(OpenField {
                    name: key.clone(),
                    raws: vec![raw.clone()],
                    array: true,
                }),
            },
            Value::Null => {
                // Last occurrence wins
                open.retain(|f| f.name != *key);
                if !raw.trim().is_empty() {
                    open.push(OpenField {
                        name: key.clone(),
                        raws: vec![raw.clone()],
                        array: false,
                    });
                }
            }
            _ => *current = coerce(key, raw, current)?,
        }
    }
    Ok(open)
}

/// `attributes[icon]` and `attributes.icon` both yield `("attributes", "icon")`
fn split_map_key(key: &str) -> Option<(&str, &str)> {
    if let Some(open) = key.find('[') {
        let entry = key[open + 1..].strip_suffix(']')?;
        return Some((&key[..open], entry));
    }
    key.split_once('.')
}

fn coerce(field: &str, raw: &str, current: &Value) -> PlinthResult<Value> {
    let invalid = |message: &str| BindingError::InvalidValue {
        attribute: field.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    };

    let value = match current {
        Value::Bool(_) => Value::Bool(parse_bool(raw).ok_or_else(|| invalid("expected a boolean"))?),
        Value::Number(_) => parse_number(raw).ok_or_else(|| invalid("expected a number"))?,
        Value::Object(_) => return Err(invalid("expected nested keys").into()),
        Value::String(_) | Value::Null | Value::Array(_) => Value::String(raw.to_string()),
    };
    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
