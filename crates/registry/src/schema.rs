//! A deliberately small JSON-Schema subset validator (spec §4.2).
//!
//! Supports the keywords procedure contracts actually need: `type`,
//! `required`, `properties`, `items`, `enum`. Anything else in a schema
//! document is ignored rather than rejected, so schemas authored against a
//! richer validator elsewhere still degrade gracefully here.

use conduit_error::ValidationIssue;
use serde_json::Value;

/// Validate `value` against `schema`, collecting every violation found
/// rather than stopping at the first one — callers report the full list
/// on a [`conduit_error::WorkflowError::InputValidation`] /
/// `OutputValidation`.
#[must_use]
pub fn validate(schema: &Value, value: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    walk(schema, value, "$", &mut issues);
    issues
}

fn walk(schema: &Value, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            issues.push(ValidationIssue::new(
                path,
                format!("expected type `{expected}`, got `{}`", type_name(value)),
            ));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            issues.push(ValidationIssue::new(path, "value is not one of the allowed enum values"));
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        let object = value.as_object();
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                let present = object.is_some_and(|o| o.contains_key(key));
                if !present {
                    issues.push(ValidationIssue::new(
                        format!("{path}.{key}"),
                        "required property is missing",
                    ));
                }
            }
        }
        if let Some(object) = object {
            for (key, sub_schema) in properties {
                if let Some(sub_value) = object.get(key) {
                    walk(sub_schema, sub_value, &format!("{path}.{key}"), issues);
                }
            }
        }
    }

    if let Some(items_schema) = schema.get("items") {
        if let Some(items) = value.as_array() {
            for (index, item) in items.iter().enumerate() {
                walk(items_schema, item, &format!("{path}[{index}]"), issues);
            }
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
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

    #[test]
    fn missing_required_property_is_reported() {
        let schema = json!({
            "type": "object",
            "required": ["orderId"],
            "properties": { "orderId": { "type": "string" } }
        });
        let issues = validate(&schema, &json!({}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "$.orderId");
    }

    #[test]
    fn wrong_type_is_reported_with_path() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } }
        });
        let issues = validate(&schema, &json!({"count": "three"}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "$.count");
    }

    #[test]
    fn valid_value_has_no_issues() {
        let schema = json!({
            "type": "object",
            "required": ["orderId", "amount"],
            "properties": {
                "orderId": { "type": "string" },
                "amount": { "type": "number" }
            }
        });
        let issues = validate(&schema, &json!({"orderId": "o-1", "amount": 42.5}));
        assert!(issues.is_empty());
    }

    #[test]
    fn enum_violation_is_reported() {
        let schema = json!({ "enum": ["premium", "standard"] });
        let issues = validate(&schema, &json!("basic"));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn array_items_validated_individually() {
        let schema = json!({
            "type": "array",
            "items": { "type": "string" }
        });
        let issues = validate(&schema, &json!(["a", 1, "c"]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "$[1]");
    }
}
