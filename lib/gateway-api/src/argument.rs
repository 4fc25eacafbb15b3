//! Backend call parameter descriptors

use crate::attribute::Attributes;
use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::scope::{Scope, ScopedValue};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Argument structure kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArgumentType {
    /// Scalar backend type: int, long, string...
    #[default]
    Primitive,
    /// Structured backend type whose `fields` are resolved one by one
    Complex,
}

/// Supplies a value without consulting any request scope
pub type ValueLoader = Arc<dyn Fn(&RequestContext) -> Option<ScopedValue> + Send + Sync>;

/// Replaces the scope lookup for one argument
pub type LookupFn =
    Arc<dyn Fn(Scope, &str, &RequestContext) -> Result<Option<ScopedValue>, ResolveError> + Send + Sync>;

/// Converts a resolved scope value into the backend type named by `class` and `generic`
pub type ValueResolver =
    Arc<dyn Fn(&str, &[String], ScopedValue) -> Result<Value, ResolveError> + Send + Sync>;

/// Runtime-only resolution hooks attached to an argument instance.
///
/// Hooks are never serialized and never take part in equality.
#[derive(Clone, Default)]
pub struct ArgumentHooks {
    pub loader: Option<ValueLoader>,
    pub lookup: Option<LookupFn>,
    pub value_resolver: Option<ValueResolver>,
}

impl fmt::Debug for ArgumentHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentHooks")
            .field("loader", &self.loader.is_some())
            .field("lookup", &self.lookup.is_some())
            .field("value_resolver", &self.value_resolver.is_some())
            .finish()
    }
}

impl PartialEq for ArgumentHooks {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// One backend call parameter and its HTTP-side binding
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub name: String,

    #[serde(default, rename = "type")]
    pub arg_type: ArgumentType,

    /// Backend type descriptor, e.g. `java.lang.String`
    #[serde(default)]
    pub class: String,

    #[serde(default)]
    pub generic: Vec<String>,

    /// Key looked up in the HTTP request; falls back to `name` when empty
    #[serde(default)]
    pub http_name: String,

    #[serde(default, deserialize_with = "deserialize_scope")]
    pub http_scope: Scope,

    /// Nested fields of a complex argument
    #[serde(default)]
    pub fields: Vec<Argument>,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(skip)]
    #[schemars(skip)]
    pub hooks: ArgumentHooks,
}

impl Argument {
    pub fn primitive(
        name: impl Into<String>,
        class: impl Into<String>,
        http_name: impl Into<String>,
        http_scope: Scope,
    ) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            http_name: http_name.into(),
            http_scope,
            ..Default::default()
        }
    }

    pub fn complex(name: impl Into<String>, class: impl Into<String>, fields: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            arg_type: ArgumentType::Complex,
            class: class.into(),
            fields,
            ..Default::default()
        }
    }

    /// The request key this argument is bound to
    pub fn lookup_key(&self) -> &str {
        if self.http_name.is_empty() {
            &self.name
        } else {
            &self.http_name
        }
    }

    pub fn is_complex(&self) -> bool {
        self.arg_type == ArgumentType::Complex
    }

    pub fn with_loader(mut self, loader: ValueLoader) -> Self {
        self.hooks.loader = Some(loader);
        self
    }

    pub fn with_lookup(mut self, lookup: LookupFn) -> Self {
        self.hooks.lookup = Some(lookup);
        self
    }

    pub fn with_value_resolver(mut self, resolver: ValueResolver) -> Self {
        self.hooks.value_resolver = Some(resolver);
        self
    }
}

fn deserialize_scope<'de, D>(deserializer: D) -> Result<Scope, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.map(|t| Scope::parse_lenient(&t)).unwrap_or_default())
}
