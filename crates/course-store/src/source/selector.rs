//! Key-value selectors.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::Document;
use crate::error::StoreError;

/// Field equality filter. A document matches when every listed field is
/// equal to the given value; an empty selector matches every document.
///
/// A `null` value matches documents where the field is null or missing.
///
/// # Example
///
/// ```
/// use course_store::Selector;
///
/// let selector = Selector::eq("name", "algebra");
/// assert_eq!(selector.get("name"), Some(&serde_json::json!("algebra")));
/// assert!(Selector::all().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    fields: BTreeMap<String, Value>,
}

impl Selector {
    /// A selector matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// A selector on a single field.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Adds another field condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, value)` conditions in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if `document` satisfies every condition.
    pub fn matches(&self, document: &Document) -> bool {
        self.fields.iter().all(|(field, expected)| {
            match (document.get(field), expected) {
                (None, Value::Null) => true,
                (Some(actual), Value::Number(expected)) => actual
                    .as_f64()
                    .zip(expected.as_f64())
                    .is_some_and(|(a, e)| a == e),
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            }
        })
    }

    /// Checks that field names are plain identifiers (ASCII letters,
    /// digits, `_` and `-`).
    pub fn validate(&self) -> Result<(), StoreError> {
        for field in self.fields.keys() {
            validate_identifier(field)?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, value)?;
        }
        write!(f, "}}")
    }
}

pub(crate) fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSelector(format!(
            "'{}' is not a valid field or collection name",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        assert!(Selector::all().matches(&doc(json!({"name": "algebra"}))));
        assert!(Selector::all().matches(&Document::new()));
    }

    #[test]
    fn test_field_equality() {
        let selector = Selector::eq("name", "algebra");

        assert!(selector.matches(&doc(json!({"name": "algebra", "price": 1}))));
        assert!(!selector.matches(&doc(json!({"name": "physics"}))));
        assert!(!selector.matches(&doc(json!({"price": 1}))));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let selector = Selector::eq("price", 10);
        assert!(selector.matches(&doc(json!({"price": 10.0}))));
    }

    #[test]
    fn test_null_matches_missing_field() {
        let selector = Selector::eq("picture", Value::Null);

        assert!(selector.matches(&doc(json!({"name": "a"}))));
        assert!(selector.matches(&doc(json!({"picture": null}))));
        assert!(!selector.matches(&doc(json!({"picture": "x.png"}))));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let selector = Selector::eq("name", "algebra").and("price", 10);

        assert!(selector.matches(&doc(json!({"name": "algebra", "price": 10}))));
        assert!(!selector.matches(&doc(json!({"name": "algebra", "price": 20}))));
    }

    #[test]
    fn test_validate_rejects_path_characters() {
        assert!(Selector::eq("preview-url-video", "x").validate().is_ok());
        assert!(Selector::eq("a.b", 1).validate().is_err());
        assert!(Selector::eq("name\"", 1).validate().is_err());
        assert!(Selector::eq("", 1).validate().is_err());
    }

    #[test]
    fn test_display() {
        let selector = Selector::eq("name", "algebra").and("price", 10);
        assert_eq!(selector.to_string(), r#"{name: "algebra", price: 10}"#);
    }
}
