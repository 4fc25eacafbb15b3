//! Conversion of resolved scope values into backend argument types

use gateway_api::{ResolveError, ScopedValue};
use serde_json::{Map, Number, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClassFamily {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Map,
    Other,
}

fn class_family(class: &str) -> ClassFamily {
    match class.trim().to_ascii_lowercase().as_str() {
        "java.lang.string" | "string" | "str" => ClassFamily::String,
        "java.lang.integer" | "java.lang.long" | "java.lang.short" | "java.lang.byte" | "int"
        | "integer" | "long" | "short" | "byte" | "i32" | "i64" => ClassFamily::Integer,
        "java.lang.float" | "java.lang.double" | "float" | "double" | "f32" | "f64" | "number" => {
            ClassFamily::Float
        }
        "java.lang.boolean" | "boolean" | "bool" => ClassFamily::Boolean,
        "java.util.list" | "java.util.arraylist" | "java.util.collection" | "java.util.set"
        | "list" | "array" | "[]" => ClassFamily::List,
        "java.util.map" | "java.util.hashmap" | "java.util.linkedhashmap" | "map" | "object" => {
            ClassFamily::Map
        }
        _ => ClassFamily::Other,
    }
}

/// Default value resolver: converts a scope value into the JSON shape of `class`.
///
/// Unknown classes (POJOs, empty class) pass the value through unchanged.
pub fn resolve_value(class: &str, generic: &[String], value: ScopedValue) -> Result<Value, ResolveError> {
    let conversion_error = |reason: String| ResolveError::Conversion {
        name: String::new(),
        class: class.to_string(),
        reason,
    };
    match class_family(class) {
        ClassFamily::String => Ok(match scalar_text(&value) {
            Some(text) => Value::String(text),
            None => value.into_json(),
        }),
        ClassFamily::Integer => match scalar(&value) {
            None => Ok(Value::Null),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            Some(other) => {
                let text = json_text(&other);
                if text.is_empty() {
                    return Ok(Value::Null);
                }
                text.trim()
                    .parse::<i64>()
                    .map(|i| Value::Number(i.into()))
                    .map_err(|e| conversion_error(format!("{:?}: {}", text, e)))
            }
        },
        ClassFamily::Float => match scalar(&value) {
            None => Ok(Value::Null),
            Some(Value::Number(n)) => Ok(Value::Number(n)),
            Some(other) => {
                let text = json_text(&other);
                if text.is_empty() {
                    return Ok(Value::Null);
                }
                let f = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| conversion_error(format!("{:?}: {}", text, e)))?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| conversion_error(format!("{} is not finite", f)))
            }
        },
        ClassFamily::Boolean => match scalar(&value) {
            None => Ok(Value::Null),
            Some(Value::Bool(b)) => Ok(Value::Bool(b)),
            Some(other) => {
                let text = json_text(&other).trim().to_ascii_lowercase();
                match text.as_str() {
                    "" => Ok(Value::Null),
                    "1" | "t" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
                    "0" | "f" | "false" | "no" | "off" => Ok(Value::Bool(false)),
                    _ => Err(conversion_error(format!("{:?} is not a boolean", text))),
                }
            }
        },
        ClassFamily::List => {
            let items: Vec<Value> = match value {
                ScopedValue::Text(s) => vec![Value::String(s)],
                ScopedValue::TextList(list) => list.into_iter().map(Value::String).collect(),
                ScopedValue::ObjectList(list) => list,
                ScopedValue::Object(Value::Array(list)) => list,
                ScopedValue::Object(Value::Null) => Vec::new(),
                other => vec![other.into_json()],
            };
            match generic.first() {
                Some(element) => items
                    .into_iter()
                    .map(|item| resolve_value(element, &[], ScopedValue::Object(item)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                None => Ok(Value::Array(items)),
            }
        }
        ClassFamily::Map => match value {
            ScopedValue::Text(s) => match serde_json::from_str::<Value>(&s) {
                Ok(Value::Object(obj)) => Ok(Value::Object(obj)),
                _ => Err(conversion_error(format!("{:?} is not a JSON object", s))),
            },
            ScopedValue::Object(Value::Null) => Ok(Value::Object(Map::new())),
            ScopedValue::Object(Value::Object(obj)) => Ok(Value::Object(obj)),
            ScopedValue::Map(_) | ScopedValue::MultiMap(_) => Ok(value.into_json()),
            other => Err(conversion_error(format!(
                "{:?} value cannot become a map",
                other.encoding()
            ))),
        },
        ClassFamily::Other => Ok(value.into_json()),
    }
}

/// First scalar carried by a value, as JSON
fn scalar(value: &ScopedValue) -> Option<Value> {
    match value {
        ScopedValue::Text(s) => Some(Value::String(s.clone())),
        ScopedValue::TextList(list) => list.first().cloned().map(Value::String),
        ScopedValue::Object(Value::Array(list)) | ScopedValue::ObjectList(list) => list.first().cloned(),
        ScopedValue::Object(Value::Null) => None,
        ScopedValue::Object(v) => Some(v.clone()),
        ScopedValue::Map(_) | ScopedValue::MultiMap(_) => None,
    }
}

fn scalar_text(value: &ScopedValue) -> Option<String> {
    match value {
        ScopedValue::Map(_) | ScopedValue::MultiMap(_) => None,
        ScopedValue::Object(Value::Object(_)) => None,
        other => scalar(other).map(|v| json_text(&v)),
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
