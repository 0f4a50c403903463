//! Filter evaluators: a sandboxed expression engine and a query-language
//! fallback.

mod expression;
mod query;

pub use expression::{ExpressionEvaluator, RhaiEvaluator};
pub use query::{JqProcess, QueryEvaluator};

use serde_json::Value;

/// Script-style truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }

    #[test]
    fn truthy_values() {
        for value in [json!(true), json!(-1), json!(0.5), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
    }
}
