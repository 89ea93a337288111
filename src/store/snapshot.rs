//! Snapshots
//!
//! Point-in-time payloads delivered by store subscriptions.

use serde_json::Value;

/// A subtree's value at the moment a notification was raised.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    key: String,
    value: Option<Value>,
}

impl Snapshot {
    /// Snapshot of `key` holding `value` (`None` when absent).
    pub fn new(key: impl Into<String>, value: Option<Value>) -> Self {
        // Null and empty objects are the same as absence in the tree.
        let value = value.filter(|v| !is_absent(v));
        Self {
            key: key.into(),
            value,
        }
    }

    /// Last path segment of the watched location (or of the child, for
    /// child-level events).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether any data lives at the location.
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// The payload, `Value::Null` when absent.
    pub fn val(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    /// Borrow the payload, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Read a top-level string field, if present.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.value.as_ref()?.get(field)?.as_str()
    }
}

/// `null` and `{}` both mean "nothing stored here".
pub(crate) fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_existence() {
        assert!(Snapshot::new("a", Some(json!({"name": "Arena"}))).exists());
        assert!(!Snapshot::new("a", None).exists());
        assert!(!Snapshot::new("a", Some(Value::Null)).exists());
        assert!(!Snapshot::new("a", Some(json!({}))).exists());
        assert_eq!(Snapshot::new("a", None).val(), Value::Null);
    }

    #[test]
    fn test_str_field() {
        let snap = Snapshot::new("abc", Some(json!({"name": "Arena", "hp": 3})));
        assert_eq!(snap.key(), "abc");
        assert_eq!(snap.str_field("name"), Some("Arena"));
        assert_eq!(snap.str_field("hp"), None);
        assert_eq!(snap.str_field("missing"), None);
    }
}
