//! Best-effort coercion of sheet text into native JSON values.
//!
//! A stored string such as `"42"`, `"true"` or `{"a":1}` becomes the number,
//! boolean or object it spells. Anything that is not a JSON literal is kept
//! as the original string; that is not an error.

use serde_json::Value;

/// Outcome of a literal parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// The text was a complete JSON literal.
    Parsed(Value),
    /// The text was not JSON; handed back untouched.
    Unparsed(String),
}

impl Coerced {
    /// Collapse into a value, falling back to the original string.
    pub fn into_value(self) -> Value {
        match self {
            Coerced::Parsed(value) => value,
            Coerced::Unparsed(text) => Value::String(text),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Coerced::Parsed(_))
    }
}

/// Try to read `text` as a single JSON literal.
pub fn try_parse_literal(text: &str) -> Coerced {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Coerced::Parsed(value),
        Err(_) => Coerced::Unparsed(text.to_string()),
    }
}

/// Coerce one leaf of a context tree.
///
/// Only strings carry text to parse; numbers and booleans from the sheet are
/// already native and pass through.
pub fn coerce_leaf(value: Value) -> Value {
    match value {
        Value::String(text) => try_parse_literal(&text).into_value(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals_are_parsed() {
        assert_eq!(try_parse_literal("42"), Coerced::Parsed(json!(42)));
        assert_eq!(try_parse_literal("true"), Coerced::Parsed(json!(true)));
        assert_eq!(try_parse_literal("null"), Coerced::Parsed(Value::Null));
        assert_eq!(
            try_parse_literal(r#"{"nestedKey":"nestedValue"}"#),
            Coerced::Parsed(json!({"nestedKey": "nestedValue"}))
        );
        assert_eq!(try_parse_literal("[1, 2]"), Coerced::Parsed(json!([1, 2])));
        assert_eq!(try_parse_literal(r#""quoted""#), Coerced::Parsed(json!("quoted")));
    }

    #[test]
    fn test_surrounding_whitespace_is_accepted() {
        assert_eq!(try_parse_literal(" 7 "), Coerced::Parsed(json!(7)));
    }

    #[test]
    fn test_plain_text_is_kept() {
        assert_eq!(try_parse_literal("Value1"), Coerced::Unparsed("Value1".into()));
        assert_eq!(try_parse_literal("True"), Coerced::Unparsed("True".into()));
        assert_eq!(try_parse_literal("{broken"), Coerced::Unparsed("{broken".into()));
        assert_eq!(try_parse_literal("1 2"), Coerced::Unparsed("1 2".into()));
        assert!(!try_parse_literal("").is_parsed());
    }

    #[test]
    fn test_coerce_leaf() {
        assert_eq!(coerce_leaf(json!("3.5")), json!(3.5));
        assert_eq!(coerce_leaf(json!("hello world")), json!("hello world"));
        assert_eq!(coerce_leaf(json!(12)), json!(12));
        assert_eq!(coerce_leaf(json!(false)), json!(false));
    }
}
