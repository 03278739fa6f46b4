//! Metadata Model - Typed View Over Persisted JSON
//!
//! Definitions arrive with an opaque JSON blob. It is converted once, totally,
//! into a `categoryKey -> propertyKey -> value` map. Nothing here can fail:
//! shapes that do not fit are dropped or kept as `Nested`.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => {
                if let Some(i) = n.as_i64() {
                    write!(f, "{}", i)
                } else if let Some(u) = n.as_u64() {
                    write!(f, "{}", u)
                } else {
                    match n.as_f64() {
                        Some(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => {
                            write!(f, "{}", x as i64)
                        }
                        Some(x) => write!(f, "{}", x),
                        None => write!(f, "{}", n),
                    }
                }
            }
        }
    }
}

/// A property value as stored in metadata.
///
/// `Nested` marks a value that is present but has no usable scalar shape
/// (a JSON object). It counts as "set" and formats to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    Nested(serde_json::Map<String, Value>),
}

impl MetadataValue {
    /// Convert a JSON value. `null` means unset and yields `None`.
    /// Null and non-scalar list elements are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(MetadataValue::List(
                items.iter().filter_map(Scalar::from_json).collect(),
            )),
            Value::Object(map) => Some(MetadataValue::Nested(map.clone())),
            other => Scalar::from_json(other).map(MetadataValue::Scalar),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Scalar(Scalar::Text(s.to_string()))
    }
}

/// Property values of one category, keyed by property key.
pub type CategoryValues = BTreeMap<String, MetadataValue>;

/// Per-definition metadata: `categoryKey -> propertyKey -> value`.
///
/// Keys iterate in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Metadata(BTreeMap<String, CategoryValues>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary JSON. Anything other than an object of objects
    /// degrades to missing entries.
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(root) = value else {
            return Self::default();
        };

        let categories = root
            .iter()
            .filter_map(|(category_key, category)| {
                let Value::Object(props) = category else {
                    tracing::trace!(category = %category_key, "skipping non-object metadata category");
                    return None;
                };
                let values: CategoryValues = props
                    .iter()
                    .filter_map(|(key, raw)| {
                        MetadataValue::from_json(raw).map(|value| (key.clone(), value))
                    })
                    .collect();
                Some((category_key.clone(), values))
            })
            .collect();

        Self(categories)
    }

    pub fn category(&self, key: &str) -> Option<&CategoryValues> {
        self.0.get(key)
    }

    pub fn value(&self, category: &str, property: &str) -> Option<&MetadataValue> {
        self.0.get(category).and_then(|props| props.get(property))
    }

    /// Category keys in lexicographic order.
    pub fn category_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|props| props.is_empty())
    }
}

impl From<Value> for Metadata {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

/// Accept any scalar for a text column: numeric primary keys become their
/// decimal text, `null` and non-scalars become empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Scalar::from_json(&value)
        .map(|scalar| scalar.to_string())
        .unwrap_or_default())
}

/// A persisted definition as handed over by the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Definition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata: Metadata::from_json(&metadata),
        }
    }
}
