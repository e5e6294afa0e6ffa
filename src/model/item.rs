//! Item definitions
//!
//! An item is a mapping of field name to value with one identifier field.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{CorpError, Result};

/// Field holding an item's unique identifier
pub const ID_FIELD: &str = "id";

/// Identifier used when a stored item arrives without one
pub const PLACEHOLDER_ID: &str = "ID_NO_PROVISTO";

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    /// Whole numbers that fit in an i64
    Integer(i64),
    /// Every other number, kept exact
    Decimal(#[serde(with = "rust_decimal::serde::str")] Decimal),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Convert a parsed JSON value, turning non-integer numbers into decimals
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => number_to_attribute(n)?,
            Value::String(s) => AttributeValue::String(s.clone()),
            Value::Array(values) => AttributeValue::List(
                values
                    .iter()
                    .map(AttributeValue::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => AttributeValue::Map(fields_from_json(map)?),
        })
    }

    /// Render as outbound JSON; decimals become strings
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Integer(i) => Value::from(*i),
            AttributeValue::Decimal(d) => Value::String(d.to_string()),
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::List(values) => {
                Value::Array(values.iter().map(AttributeValue::to_json).collect())
            }
            AttributeValue::Map(fields) => Value::Object(fields_to_json(fields)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<Decimal> for AttributeValue {
    fn from(value: Decimal) -> Self {
        AttributeValue::Decimal(value)
    }
}

/// A stored record: field name → value, addressed by its `id` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    fields: BTreeMap<String, AttributeValue>,
}

impl Item {
    /// Create an empty item
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an item from a JSON object
    pub fn from_json_object(map: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            fields: fields_from_json(map)?,
        })
    }

    /// Build an item from a JSON value, which must be an object
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_json_object(map),
            other => Err(CorpError::InvalidItem(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// Render as outbound JSON
    pub fn to_json(&self) -> Value {
        Value::Object(fields_to_json(&self.fields))
    }

    /// The identifier this item is stored under
    pub fn key(&self) -> Result<String> {
        match self.fields.get(ID_FIELD) {
            Some(AttributeValue::String(s)) => Ok(s.clone()),
            Some(AttributeValue::Integer(i)) => Ok(i.to_string()),
            Some(AttributeValue::Decimal(d)) => Ok(d.to_string()),
            Some(other) => Err(CorpError::InvalidItem(format!(
                "field '{}' must be a string or a number, got {:?}",
                ID_FIELD, other
            ))),
            None => Err(CorpError::InvalidItem(format!(
                "missing field '{}'",
                ID_FIELD
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field, returning the previous value
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Turn a client-supplied identifier into a table key.
///
/// Accepts non-empty strings and numbers; everything else is rejected.
/// Numbers map to the same key the stored item would get.
pub fn key_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => match number_to_attribute(n) {
            Ok(AttributeValue::Integer(i)) => Some(i.to_string()),
            Ok(AttributeValue::Decimal(d)) => Some(d.to_string()),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

fn fields_from_json(map: &Map<String, Value>) -> Result<BTreeMap<String, AttributeValue>> {
    map.iter()
        .map(|(name, value)| Ok((name.clone(), AttributeValue::from_json(value)?)))
        .collect()
}

fn fields_to_json(fields: &BTreeMap<String, AttributeValue>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

fn number_to_attribute(n: &Number) -> Result<AttributeValue> {
    if let Some(i) = n.as_i64() {
        return Ok(AttributeValue::Integer(i));
    }

    // Exact text as received, never rounded through f64
    let text = n.to_string();
    let parsed = if text.contains(|c: char| c == 'e' || c == 'E') {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str_exact(&text)
    };

    parsed.map(AttributeValue::Decimal).map_err(|e| {
        CorpError::InvalidItem(format!(
            "number {} cannot be stored as an exact decimal: {}",
            text, e
        ))
    })
}
