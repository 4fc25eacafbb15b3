//! Request scopes an argument can be bound to, and the tagged values they yield

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Where in the inbound request an argument value is looked up
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Scope {
    /// Single dynamic path variable
    #[serde(rename = "PATH")]
    Path,
    /// All path variables
    #[serde(rename = "PATH_MAP")]
    PathMap,
    #[serde(rename = "QUERY")]
    Query,
    #[serde(rename = "QUERY_MUL")]
    QueryMulti,
    #[serde(rename = "QUERY_MAP")]
    QueryMap,
    #[serde(rename = "FORM")]
    Form,
    #[serde(rename = "FORM_MUL")]
    FormMulti,
    #[serde(rename = "FORM_MAP")]
    FormMap,
    /// Query first, then form
    #[serde(rename = "PARAM")]
    Param,
    #[serde(rename = "HEADER")]
    Header,
    #[serde(rename = "HEADER_MAP")]
    HeaderMap,
    /// Single request attribute
    #[serde(rename = "ATTR")]
    Attr,
    /// All request attributes
    #[serde(rename = "ATTRS")]
    Attrs,
    #[serde(rename = "BODY")]
    Body,
    /// Request metadata such as method or uri
    #[serde(rename = "REQUEST")]
    Request,
    /// Try the concrete scopes in a fixed order
    #[default]
    #[serde(rename = "AUTO")]
    Auto,
}

impl Scope {
    pub const ALL: [Scope; 16] = [
        Scope::Path,
        Scope::PathMap,
        Scope::Query,
        Scope::QueryMulti,
        Scope::QueryMap,
        Scope::Form,
        Scope::FormMulti,
        Scope::FormMap,
        Scope::Param,
        Scope::Header,
        Scope::HeaderMap,
        Scope::Attr,
        Scope::Attrs,
        Scope::Body,
        Scope::Request,
        Scope::Auto,
    ];

    /// Fallback chain tried by [`Scope::Auto`], in order
    pub const AUTO_CHAIN: [Scope; 5] = [
        Scope::Path,
        Scope::Query,
        Scope::Form,
        Scope::Header,
        Scope::Attr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Path => "PATH",
            Scope::PathMap => "PATH_MAP",
            Scope::Query => "QUERY",
            Scope::QueryMulti => "QUERY_MUL",
            Scope::QueryMap => "QUERY_MAP",
            Scope::Form => "FORM",
            Scope::FormMulti => "FORM_MUL",
            Scope::FormMap => "FORM_MAP",
            Scope::Param => "PARAM",
            Scope::Header => "HEADER",
            Scope::HeaderMap => "HEADER_MAP",
            Scope::Attr => "ATTR",
            Scope::Attrs => "ATTRS",
            Scope::Body => "BODY",
            Scope::Request => "REQUEST",
            Scope::Auto => "AUTO",
        }
    }

    /// Whether the scope yields a whole collection and ignores the lookup key
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Scope::PathMap
                | Scope::QueryMap
                | Scope::FormMap
                | Scope::HeaderMap
                | Scope::Attrs
                | Scope::Body
        )
    }

    /// Parse a scope tag leniently: unknown or empty tags fall back to `Auto`.
    pub fn parse_lenient(tag: &str) -> Scope {
        tag.parse().unwrap_or(Scope::Auto)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == upper)
            .ok_or_else(|| format!("unknown scope: {}", s))
    }
}

/// Encoding tag carried by every resolved value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// Single scalar string
    Text,
    /// List of scalar strings
    TextList,
    /// Opaque structured object
    Object,
    /// List of objects
    ObjectList,
    /// String-keyed map of objects
    Map,
    /// String-keyed map of string lists
    MultiMap,
}

/// A value resolved from one request scope
#[derive(Clone, Debug, PartialEq)]
pub enum ScopedValue {
    Text(String),
    TextList(Vec<String>),
    Object(Value),
    ObjectList(Vec<Value>),
    Map(BTreeMap<String, Value>),
    MultiMap(BTreeMap<String, Vec<String>>),
}

impl ScopedValue {
    pub fn encoding(&self) -> Encoding {
        match self {
            ScopedValue::Text(_) => Encoding::Text,
            ScopedValue::TextList(_) => Encoding::TextList,
            ScopedValue::Object(_) => Encoding::Object,
            ScopedValue::ObjectList(_) => Encoding::ObjectList,
            ScopedValue::Map(_) => Encoding::Map,
            ScopedValue::MultiMap(_) => Encoding::MultiMap,
        }
    }

    /// Convert into a plain JSON value for transport
    pub fn into_json(self) -> Value {
        match self {
            ScopedValue::Text(s) => Value::String(s),
            ScopedValue::TextList(list) => Value::Array(list.into_iter().map(Value::String).collect()),
            ScopedValue::Object(v) => v,
            ScopedValue::ObjectList(list) => Value::Array(list),
            ScopedValue::Map(map) => Value::Object(map.into_iter().collect::<Map<String, Value>>()),
            ScopedValue::MultiMap(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::Array(v.into_iter().map(Value::String).collect())))
                    .collect(),
            ),
        }
    }
}
