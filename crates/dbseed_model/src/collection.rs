//! Collection creation options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options applied once, when a collection is created.
///
/// The options are an open JSON object handed to the database's `create`
/// command as-is (`validator`, `validationLevel`, `capped`, `size`, ...).
/// They are never reconciled against a collection that already exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionOptions(Map<String, Value>);

impl CollectionOptions {
    /// No options: a plain collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary `create` option.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Attach a schema validator document.
    #[must_use]
    pub fn with_validator(self, validator: Value) -> Self {
        self.with("validator", validator)
    }

    /// Returns `true` if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw option map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(CollectionOptions::new().is_empty());
    }

    #[test]
    fn test_validator_is_passed_through() {
        let options = CollectionOptions::new()
            .with_validator(json!({ "$jsonSchema": { "bsonType": "object" } }))
            .with("validationLevel", json!("strict"));
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({
                "validator": { "$jsonSchema": { "bsonType": "object" } },
                "validationLevel": "strict"
            })
        );
    }
}
