//! Records: rows of typed values keyed by property id.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::{PropertyId, RecordId};
use crate::value::PropertyValue;

/// One record of a module. The value map need not contain every schema
/// property; a missing entry is empty/null for display, filtering, and
/// sorting. Entries under property ids the schema no longer knows are kept
/// and tolerated (display-only garbage after a property deletion).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub properties: IndexMap<PropertyId, PropertyValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Record {
    /// Create an empty record with a minted id and current timestamps.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            properties: IndexMap::new(),
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Create an empty record with an explicit id (store-issued).
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        let mut record = Self::new();
        record.id = id.into();
        record
    }

    /// Set a value at construction time.
    pub fn with_value(mut self, property: impl Into<PropertyId>, value: PropertyValue) -> Self {
        self.properties.insert(property.into(), value);
        self
    }

    /// Set the creator.
    pub fn with_created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    /// The stored value for a property, if any.
    pub fn value(&self, property: &PropertyId) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Write or clear one value and touch `updated_at`. `None` removes the
    /// entry so the property reads as empty again.
    pub fn set_value(&mut self, property: PropertyId, value: Option<PropertyValue>) {
        match value {
            Some(value) => {
                self.properties.insert(property, value);
            }
            None => {
                self.properties.shift_remove(&property);
            }
        }
        self.updated_at = Utc::now();
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_property_reads_as_none() {
        let record = Record::new();
        assert!(record.value(&PropertyId::from_string("title")).is_none());
    }

    #[test]
    fn set_value_none_clears_the_entry() {
        let mut record =
            Record::new().with_value("title", PropertyValue::Text("Dune".into()));
        let title = PropertyId::from_string("title");
        assert!(record.value(&title).is_some());
        record.set_value(title.clone(), None);
        assert!(record.value(&title).is_none());
        assert!(!record.properties.contains_key(&title));
    }

    #[test]
    fn set_value_touches_updated_at() {
        let mut record = Record::new();
        let before = record.updated_at;
        record.set_value(
            PropertyId::from_string("done"),
            Some(PropertyValue::Checkbox(true)),
        );
        assert!(record.updated_at >= before);
    }

    #[test]
    fn value_map_preserves_insertion_order_through_serde() {
        let record = Record::with_id("r1")
            .with_value("b", PropertyValue::Number(2.0))
            .with_value("a", PropertyValue::Number(1.0))
            .with_value("c", PropertyValue::Number(3.0));
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        let keys: Vec<_> = back.properties.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn unknown_property_ids_survive_round_trips() {
        // Values orphaned by a property deletion stay on the record.
        let record = Record::with_id("r1").with_value(
            "deleted-prop",
            PropertyValue::Text("still here".into()),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.value(&PropertyId::from_string("deleted-prop"))
                .and_then(|v| v.as_text()),
            Some("still here")
        );
    }
}
