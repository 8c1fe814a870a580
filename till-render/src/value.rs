//! Helpers over bound record values

use serde_json::Value;

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Empty values are false: null, false, 0, "", [] and {}
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for value in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&value), "{value} should be false");
        }
        for value in [json!(true), json!(1), json!(0.5), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(is_truthy(&value), "{value} should be true");
        }
    }

    #[test]
    fn test_write_value() {
        let mut out = String::new();
        write_value(&mut out, &json!("a"));
        write_value(&mut out, &json!(null));
        write_value(&mut out, &json!(12));
        write_value(&mut out, &json!(true));
        assert_eq!(out, "a12true");
    }
}
