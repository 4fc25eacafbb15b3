//! Argument scope resolution: locate backend call arguments in the inbound request

use crate::value_types::resolve_value;
use gateway_api::{Argument, RequestContext, ResolveError, Scope, ScopedValue};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// One argument ready to be sent to a backend
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedArgument {
    pub name: String,
    pub class: String,
    pub generic: Vec<String>,
    /// `Null` when no scope supplied a value
    pub value: Value,
}

/// Look up `key` in one request scope.
///
/// `Ok(None)` means the scope holds no value; it is never an error, including
/// when every scope of the `Auto` chain comes up empty.
pub fn lookup(scope: Scope, key: &str, ctx: &RequestContext) -> Result<Option<ScopedValue>, ResolveError> {
    if key.is_empty() && !scope.is_collection() {
        return Err(ResolveError::EmptyKey(scope));
    }
    let text = |v: Option<&str>| v.map(|s| ScopedValue::Text(s.to_string()));
    let list = |v: Option<&[String]>| v.map(|s| ScopedValue::TextList(s.to_vec()));

    let value = match scope {
        Scope::Path => text(ctx.path_var(key)),
        Scope::PathMap => Some(ScopedValue::Map(
            ctx.path_vars
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )),
        Scope::Query => text(ctx.query_var(key)),
        Scope::QueryMulti => list(ctx.query_vars(key)),
        Scope::QueryMap => Some(ScopedValue::MultiMap(ctx.query.clone())),
        Scope::Form => text(ctx.form_var(key)),
        Scope::FormMulti => list(ctx.form_vars(key)),
        Scope::FormMap => Some(ScopedValue::MultiMap(ctx.form.clone())),
        Scope::Param => text(ctx.query_var(key).or_else(|| ctx.form_var(key))),
        Scope::Header => text(ctx.header_var(key)),
        Scope::HeaderMap => Some(ScopedValue::MultiMap(ctx.headers.clone())),
        Scope::Attr => ctx.attribute(key).cloned().map(ScopedValue::Object),
        Scope::Attrs => Some(ScopedValue::Map(ctx.attributes.clone())),
        Scope::Body => lookup_body(ctx)?,
        Scope::Request => text(ctx.metadata(key)),
        Scope::Auto => {
            for candidate in Scope::AUTO_CHAIN {
                if let Some(found) = lookup(candidate, key, ctx)? {
                    trace!(key, scope = %candidate, "Auto scope matched");
                    return Ok(Some(found));
                }
            }
            None
        }
    };
    Ok(value)
}

fn lookup_body(ctx: &RequestContext) -> Result<Option<ScopedValue>, ResolveError> {
    if ctx.body.is_empty() {
        return Ok(None);
    }
    let content_type = ctx.content_type.to_ascii_lowercase();
    if content_type.contains("json") {
        let parsed: Value = serde_json::from_slice(&ctx.body)
            .map_err(|e| ResolveError::MalformedBody(e.to_string()))?;
        return Ok(Some(match parsed {
            Value::Array(items) => ScopedValue::ObjectList(items),
            other => ScopedValue::Object(other),
        }));
    }
    if content_type.contains("x-www-form-urlencoded") {
        let mut form: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in url::form_urlencoded::parse(&ctx.body) {
            form.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        return Ok(Some(ScopedValue::MultiMap(form)));
    }
    Ok(Some(ScopedValue::Object(Value::String(
        String::from_utf8_lossy(&ctx.body).into_owned(),
    ))))
}

/// Resolve one argument against the request.
///
/// Complex arguments with declared fields resolve each field recursively and
/// assemble an object from the fields that were found.
pub fn resolve_argument(arg: &Argument, ctx: &RequestContext) -> Result<Option<Value>, ResolveError> {
    if let Some(loader) = &arg.hooks.loader {
        if let Some(value) = loader(ctx) {
            return convert(arg, value).map(Some);
        }
    }

    if arg.is_complex() && !arg.fields.is_empty() {
        let mut object = Map::with_capacity(arg.fields.len());
        for field in &arg.fields {
            if let Some(value) = resolve_argument(field, ctx)? {
                object.insert(field.name.clone(), value);
            }
        }
        return Ok(Some(Value::Object(object)));
    }

    let key = arg.lookup_key();
    let found = match &arg.hooks.lookup {
        Some(custom) => custom(arg.http_scope, key, ctx)?,
        None => lookup(arg.http_scope, key, ctx)?,
    };
    match found {
        Some(value) => convert(arg, value).map(Some),
        None => {
            trace!(argument = %arg.name, scope = %arg.http_scope, "Argument value not found");
            Ok(None)
        }
    }
}

/// Resolve every argument in declaration order; missing values become `Null`
pub fn resolve_arguments(
    args: &[Argument],
    ctx: &RequestContext,
) -> Result<Vec<ResolvedArgument>, ResolveError> {
    args.iter()
        .map(|arg| {
            Ok(ResolvedArgument {
                name: arg.name.clone(),
                class: arg.class.clone(),
                generic: arg.generic.clone(),
                value: resolve_argument(arg, ctx)?.unwrap_or(Value::Null),
            })
        })
        .collect()
}

fn convert(arg: &Argument, value: ScopedValue) -> Result<Value, ResolveError> {
    let converted = match &arg.hooks.value_resolver {
        Some(custom) => custom(&arg.class, &arg.generic, value),
        None => resolve_value(&arg.class, &arg.generic, value),
    };
    converted.map_err(|e| match e {
        ResolveError::Conversion { class, reason, .. } => ResolveError::Conversion {
            name: arg.name.clone(),
            class,
            reason,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_api::Encoding;
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> RequestContext {
        RequestContext::new("POST", "/users/42?tag=a&tag=b")
            .with_path_var("id", "42")
            .with_query("tag", "a")
            .with_query("tag", "b")
            .with_form("name", "alice")
            .with_header("X-Token", "secret")
            .with_attribute("uid", json!(1001))
    }

    #[test]
    fn test_single_scopes() {
        let ctx = request();
        assert_eq!(
            lookup(Scope::Path, "id", &ctx).unwrap(),
            Some(ScopedValue::Text("42".into()))
        );
        assert_eq!(
            lookup(Scope::QueryMulti, "tag", &ctx).unwrap(),
            Some(ScopedValue::TextList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            lookup(Scope::Param, "name", &ctx).unwrap(),
            Some(ScopedValue::Text("alice".into()))
        );
        assert_eq!(
            lookup(Scope::Header, "x-token", &ctx).unwrap(),
            Some(ScopedValue::Text("secret".into()))
        );
        assert_eq!(
            lookup(Scope::Attr, "uid", &ctx).unwrap(),
            Some(ScopedValue::Object(json!(1001)))
        );
        assert_eq!(
            lookup(Scope::Request, "method", &ctx).unwrap(),
            Some(ScopedValue::Text("POST".into()))
        );
        assert_eq!(lookup(Scope::Query, "missing", &ctx).unwrap(), None);
    }

    #[test]
    fn test_collection_scopes_carry_encoding() {
        let ctx = request();
        let encodings: Vec<Encoding> = [Scope::PathMap, Scope::QueryMap, Scope::HeaderMap, Scope::Attrs]
            .iter()
            .map(|s| lookup(*s, "", &ctx).unwrap().unwrap().encoding())
            .collect();
        assert_eq!(
            encodings,
            vec![Encoding::Map, Encoding::MultiMap, Encoding::MultiMap, Encoding::Map]
        );
    }

    #[test]
    fn test_empty_key_is_error() {
        let ctx = request();
        assert_eq!(
            lookup(Scope::Query, "", &ctx),
            Err(ResolveError::EmptyKey(Scope::Query))
        );
    }

    #[test]
    fn test_auto_chain_order() {
        // path wins over query for the same key
        let ctx = RequestContext::default()
            .with_query("id", "from-query")
            .with_path_var("id", "from-path");
        assert_eq!(
            lookup(Scope::Auto, "id", &ctx).unwrap(),
            Some(ScopedValue::Text("from-path".into()))
        );
        let ctx = RequestContext::default().with_attribute("id", json!("from-attr"));
        assert_eq!(
            lookup(Scope::Auto, "id", &ctx).unwrap(),
            Some(ScopedValue::Object(json!("from-attr")))
        );
    }

    #[test]
    fn test_auto_miss_is_not_found() {
        let ctx = request().with_body("application/json", br#"{"other":1}"#.to_vec());
        assert_eq!(lookup(Scope::Auto, "absent", &ctx).unwrap(), None);
        let arg = Argument::primitive("absent", "java.lang.String", "", Scope::Auto);
        assert_eq!(resolve_argument(&arg, &ctx).unwrap(), None);
    }

    #[test]
    fn test_body_scope() {
        let ctx = RequestContext::default().with_body("application/json", br#"[{"a":1}]"#.to_vec());
        assert_eq!(
            lookup(Scope::Body, "", &ctx).unwrap(),
            Some(ScopedValue::ObjectList(vec![json!({"a": 1})]))
        );
        let ctx = RequestContext::default()
            .with_body("application/x-www-form-urlencoded", b"a=1&a=2&b=x".to_vec());
        let mut expected = BTreeMap::new();
        expected.insert("a".to_string(), vec!["1".to_string(), "2".to_string()]);
        expected.insert("b".to_string(), vec!["x".to_string()]);
        assert_eq!(
            lookup(Scope::Body, "", &ctx).unwrap(),
            Some(ScopedValue::MultiMap(expected))
        );
        let ctx = RequestContext::default().with_body("application/json", b"{oops".to_vec());
        assert!(matches!(
            lookup(Scope::Body, "", &ctx),
            Err(ResolveError::MalformedBody(_))
        ));
        assert_eq!(lookup(Scope::Body, "", &RequestContext::default()).unwrap(), None);
    }

    #[test]
    fn test_complex_argument_binds_fields() {
        let ctx = request();
        let arg = Argument::complex(
            "query",
            "com.example.UserQuery",
            vec![
                Argument::primitive("id", "java.lang.Long", "id", Scope::Path),
                Argument::primitive("tags", "java.util.List", "tag", Scope::QueryMulti),
                Argument::primitive("token", "java.lang.String", "X-Token", Scope::Header),
                Argument::primitive("missing", "java.lang.String", "", Scope::Query),
            ],
        );
        assert_eq!(
            resolve_argument(&arg, &ctx).unwrap(),
            Some(json!({"id": 42, "tags": ["a", "b"], "token": "secret"}))
        );
    }

    #[test]
    fn test_resolve_arguments_in_order() {
        let ctx = request();
        let args = vec![
            Argument::primitive("id", "int", "", Scope::Path),
            Argument::primitive("nothing", "int", "", Scope::Auto),
        ];
        let resolved = resolve_arguments(&args, &ctx).unwrap();
        assert_eq!(resolved[0].value, json!(42));
        assert_eq!(resolved[1].name, "nothing");
        assert_eq!(resolved[1].value, Value::Null);
    }

    #[test]
    fn test_conversion_error_names_argument() {
        let ctx = RequestContext::default().with_query("age", "old");
        let arg = Argument::primitive("age", "int", "", Scope::Query);
        match resolve_argument(&arg, &ctx) {
            Err(ResolveError::Conversion { name, class, .. }) => {
                assert_eq!(name, "age");
                assert_eq!(class, "int");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_hooks() {
        let ctx = request();
        let loaded = Argument::primitive("fixed", "string", "", Scope::Query)
            .with_loader(Arc::new(|_| Some(ScopedValue::Text("constant".into()))));
        assert_eq!(resolve_argument(&loaded, &ctx).unwrap(), Some(json!("constant")));

        let custom = Argument::primitive("id", "string", "id", Scope::Path).with_lookup(Arc::new(
            |scope, key, _ctx| Ok(Some(ScopedValue::Text(format!("{}:{}", scope, key)))),
        ));
        assert_eq!(resolve_argument(&custom, &ctx).unwrap(), Some(json!("PATH:id")));

        let upper = Argument::primitive("id", "string", "id", Scope::Path).with_value_resolver(
            Arc::new(|_class, _generic, value| Ok(json!(format!("#{}", value.into_json())))),
        );
        assert_eq!(resolve_argument(&upper, &ctx).unwrap(), Some(json!("#\"42\"")));
    }

    #[test]
    fn test_resolution_does_not_mutate_context() {
        let ctx = request();
        let before = format!("{:?}", ctx);
        let _ = lookup(Scope::Auto, "id", &ctx);
        let _ = resolve_arguments(&[Argument::primitive("id", "int", "", Scope::Path)], &ctx);
        assert_eq!(format!("{:?}", ctx), before);
    }
}
