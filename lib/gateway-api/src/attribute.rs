//! Named metadata attached to services and endpoints

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, opaque metadata value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Read the value as a string. List values yield their first element.
    pub fn as_string(&self) -> String {
        match &self.value {
            Value::Array(values) => values.first().map(value_to_string).unwrap_or_default(),
            other => value_to_string(other),
        }
    }

    pub fn as_strings(&self) -> Vec<String> {
        match &self.value {
            Value::Null => Vec::new(),
            Value::Array(values) => values.iter().map(value_to_string).collect(),
            Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
            other => vec![value_to_string(other)],
        }
    }

    /// Lenient integer read; anything that does not parse is 0.
    pub fn as_int(&self) -> i64 {
        match &self.value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
            Value::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        match &self.value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "t" | "true"
            ),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Ordered attribute list embedded by both services and endpoints.
///
/// Lookup is case-insensitive and the first match in declaration order wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Attributes(pub Vec<Attribute>);

impl Attributes {
    pub fn new(attrs: Vec<Attribute>) -> Self {
        Self(attrs)
    }

    /// Returns the named attribute, or an empty one when absent
    pub fn get_attr(&self, name: &str) -> Attribute {
        self.get_attr_ex(name).cloned().unwrap_or_default()
    }

    pub fn get_attr_ex(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    pub fn get_attrs(&self, name: &str) -> Vec<&Attribute> {
        self.0
            .iter()
            .filter(|attr| attr.name.eq_ignore_ascii_case(name))
            .collect()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr_ex(name).is_some()
    }

    pub fn push(&mut self, attr: Attribute) {
        self.0.push(attr);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(attrs: Vec<Attribute>) -> Self {
        Self(attrs)
    }
}
