//! Masking of sensitive values before they reach a log sink

use serde_json::{Map, Value};

pub const MASK: &str = "***SANITIZED***";

#[derive(Clone, Debug)]
pub struct Sanitizer {
    fields: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&["password", "token", "credential", "secret"])
    }
}

impl Sanitizer {
    pub fn new<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|f| f.as_ref().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    fn is_sensitive(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.fields.iter().any(|f| lower.contains(f.as_str()))
    }

    /// Mask values under sensitive keys, and string values that mention a
    /// sensitive word, recursively
    pub fn sanitize(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, inner) in map {
                    let masked = if self.is_sensitive(key) {
                        Value::String(MASK.to_string())
                    } else {
                        self.sanitize(inner)
                    };
                    out.insert(key.clone(), masked);
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.sanitize(v)).collect()),
            Value::String(s) if self.is_sensitive(s) => Value::String(MASK.to_string()),
            other => other.clone(),
        }
    }
}
