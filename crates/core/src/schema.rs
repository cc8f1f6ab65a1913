//! Structural validation of tool arguments against a tool's declared
//! parameter schema.
//!
//! Only the subset of JSON Schema that tool declarations actually use is
//! honoured: top-level `type: object`, `required`, and per-property `type`
//! and `enum`. Unknown properties are allowed.

use serde_json::Value;

/// Check `args` against `schema`. The error string names the first offending
/// field.
pub fn validate(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(obj) = args.as_object() else {
        return Err(format!("expected a JSON object, got {}", type_name(args)));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if obj.get(field).is_none_or(Value::is_null) {
                return Err(format!("missing required field '{field}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in obj {
        let Some(spec) = properties.get(field) else { continue };
        if value.is_null() {
            continue;
        }
        if let Some(expected) = spec.get("type").and_then(Value::as_str)
            && !matches_type(expected, value)
        {
            return Err(format!(
                "field '{field}' should be {expected}, got {}",
                type_name(value)
            ));
        }
        if let Some(allowed) = spec.get("enum").and_then(Value::as_array)
            && !allowed.contains(value)
        {
            return Err(format!("field '{field}' must be one of {}", Value::Array(allowed.clone())));
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
                "mode": { "type": "string", "enum": ["overwrite", "append"] },
                "retries": { "type": "integer" }
            },
            "required": ["path", "content"]
        })
    }

    #[test]
    fn accepts_well_formed_arguments() {
        let args = json!({"path": "a.txt", "content": "hi", "retries": 2});
        assert!(validate(&write_schema(), &args).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate(&write_schema(), &json!({"path": "a.txt"})).unwrap_err();
        assert!(err.contains("content"));
    }

    #[test]
    fn rejects_wrong_primitive_type() {
        let err = validate(&write_schema(), &json!({"path": 7, "content": "x"})).unwrap_err();
        assert!(err.contains("'path'"));
        assert!(err.contains("string"));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let args = json!({"path": "a", "content": "b", "mode": "truncate"});
        assert!(validate(&write_schema(), &args).is_err());
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(validate(&write_schema(), &json!(["a.txt"])).is_err());
    }

    #[test]
    fn float_is_not_an_integer() {
        let args = json!({"path": "a", "content": "b", "retries": 1.5});
        assert!(validate(&write_schema(), &args).is_err());
    }

    #[test]
    fn unknown_properties_are_tolerated() {
        let args = json!({"path": "a", "content": "b", "note": true});
        assert!(validate(&write_schema(), &args).is_ok());
    }
}
