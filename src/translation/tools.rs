// Tool schema sanitization for the Gemini API

use serde_json::Value;

/// Sanitize a JSON Schema for Gemini's function declarations.
///
/// Gemini rejects several JSON Schema keywords outright; they are stripped
/// everywhere except inside `properties` maps, where keys are user-chosen
/// property names rather than schema keywords.
pub fn sanitize_schema(mut schema: Value) -> Value {
    const FORBIDDEN: &[&str] = &[
        // JSON Schema meta keywords
        "$schema",
        "$id",
        "$ref",
        "definitions",
        "$defs",
        // Range constraints not supported
        "exclusiveMinimum",
        "exclusiveMaximum",
        "minimum",
        "maximum",
        // String constraints not supported
        "minLength",
        "maxLength",
        // Array constraints not supported
        "minItems",
        "maxItems",
        // Additional schema keywords not supported
        "propertyNames",
        "patternProperties",
        "additionalItems",
        "default",
        "pattern",
        // Content keywords not supported
        "contentMediaType",
        "contentEncoding",
    ];

    schema = remove_keys(schema, FORBIDDEN);
    schema = sanitize_format_field(schema);
    schema = sanitize_additional_properties(schema);
    schema = ensure_type_fields(schema);
    schema
}

fn remove_keys(value: Value, forbidden: &[&str]) -> Value {
    remove_keys_impl(value, forbidden, false)
}

fn remove_keys_impl(value: Value, forbidden: &[&str], inside_properties: bool) -> Value {
    match value {
        Value::Object(mut map) => {
            if !inside_properties {
                map.retain(|k, _| !forbidden.contains(&k.as_str()));
            }

            for (key, v) in map.iter_mut() {
                let entering_properties = key == "properties" || key == "items";
                *v = remove_keys_impl(v.clone(), forbidden, entering_properties);
            }

            Value::Object(map)
        }
        Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(|v| remove_keys_impl(v, forbidden, inside_properties))
                .collect(),
        ),
        other => other,
    }
}

/// Only 'enum' and 'date-time' are accepted in `format` fields.
fn sanitize_format_field(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(format) = map.get("format") {
                if let Some(format_str) = format.as_str() {
                    if format_str != "enum" && format_str != "date-time" {
                        map.remove("format");
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                *v = sanitize_format_field(v.clone());
            }

            Value::Object(map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sanitize_format_field).collect()),
        other => other,
    }
}

fn sanitize_additional_properties(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(additional) = map.get("additionalProperties") {
                if let Some(obj) = additional.as_object() {
                    if obj.is_empty() {
                        map.insert("additionalProperties".to_string(), Value::Bool(false));
                    } else if obj.len() == 1 && obj.contains_key("type") {
                        // Simple type constraint stays as-is
                    } else {
                        map.insert("additionalProperties".to_string(), Value::Bool(true));
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                *v = sanitize_additional_properties(v.clone());
            }

            Value::Object(map)
        }
        Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(sanitize_additional_properties)
                .collect(),
        ),
        other => other,
    }
}

/// Objects with properties but no declared type become `"type": "object"`.
fn ensure_type_fields(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if !map.contains_key("type")
                && !map.contains_key("anyOf")
                && !map.contains_key("allOf")
                && !map.contains_key("oneOf")
                && map.contains_key("properties")
            {
                map.insert("type".to_string(), serde_json::json!("object"));
            }

            for (_, v) in map.iter_mut() {
                *v = ensure_type_fields(v.clone());
            }

            Value::Object(map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(ensure_type_fields).collect()),
        other => other,
    }
}
