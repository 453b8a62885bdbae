//! Typed property values.
//!
//! `PropertyValue` is a closed union keyed by value shape. Several property
//! types share a shape (TEXT/URL/EMAIL/PHONE are all `Text`); FORMULA and
//! ROLLUP values arrive in whatever shape the server-side expression yields,
//! so consumers dispatch on the stored shape rather than the declared type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OptionId, RecordId};
use crate::property::PropertyType;

/// A property value as stored on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Select(OptionId),
    MultiSelect(Vec<OptionId>),
    Date(DateTime<Utc>),
    Checkbox(bool),
    Relation(Vec<RecordId>),
    User(String),
}

impl PropertyValue {
    /// The wire name of this value's shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Select(_) => "select",
            Self::MultiSelect(_) => "multi_select",
            Self::Date(_) => "date",
            Self::Checkbox(_) => "checkbox",
            Self::Relation(_) => "relation",
            Self::User(_) => "user",
        }
    }

    /// Whether this value counts as empty for filtering (`is_empty`) and
    /// display. A checkbox is never empty; false is a real state.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::User(s) => s.is_empty(),
            Self::MultiSelect(ids) => ids.is_empty(),
            Self::Relation(ids) => ids.is_empty(),
            Self::Number(_) | Self::Select(_) | Self::Date(_) | Self::Checkbox(_) => false,
        }
    }

    /// Whether this shape is legal for the declared property type. Computed
    /// types accept any shape.
    pub fn matches_type(&self, type_: PropertyType) -> bool {
        match type_ {
            PropertyType::Text | PropertyType::Url | PropertyType::Email | PropertyType::Phone => {
                matches!(self, Self::Text(_))
            }
            PropertyType::Number => matches!(self, Self::Number(_)),
            PropertyType::Select => matches!(self, Self::Select(_)),
            PropertyType::MultiSelect => matches!(self, Self::MultiSelect(_)),
            PropertyType::Date | PropertyType::CreatedTime | PropertyType::LastEditedTime => {
                matches!(self, Self::Date(_))
            }
            PropertyType::Checkbox => matches!(self, Self::Checkbox(_)),
            PropertyType::Relation => matches!(self, Self::Relation(_)),
            PropertyType::CreatedBy | PropertyType::LastEditedBy => matches!(self, Self::User(_)),
            PropertyType::Formula | PropertyType::Rollup => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&OptionId> {
        match self {
            Self::Select(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_multi_select(&self) -> Option<&[OptionId]> {
        match self {
            Self::MultiSelect(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_checkbox(&self) -> Option<bool> {
        match self {
            Self::Checkbox(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&[RecordId]> {
        match self {
            Self::Relation(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&str> {
        match self {
            Self::User(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Checkbox(b)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Date(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_tag_their_shape_on_the_wire() {
        let value = PropertyValue::MultiSelect(vec![
            OptionId::from_string("a"),
            OptionId::from_string("b"),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "multi_select", "value": ["a", "b"]})
        );
        let back: PropertyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn emptiness_per_shape() {
        assert!(PropertyValue::Text(String::new()).is_empty());
        assert!(!PropertyValue::Text("x".into()).is_empty());
        assert!(PropertyValue::MultiSelect(vec![]).is_empty());
        assert!(PropertyValue::Relation(vec![]).is_empty());
        assert!(!PropertyValue::Checkbox(false).is_empty());
        assert!(!PropertyValue::Number(0.0).is_empty());
    }

    #[test]
    fn shape_matches_declared_type() {
        let text = PropertyValue::Text("hi".into());
        assert!(text.matches_type(PropertyType::Text));
        assert!(text.matches_type(PropertyType::Url));
        assert!(!text.matches_type(PropertyType::Number));
        // Computed results may carry any shape.
        assert!(text.matches_type(PropertyType::Formula));
        assert!(PropertyValue::Number(1.0).matches_type(PropertyType::Rollup));
    }

    #[test]
    fn timestamps_use_datetime_shape() {
        let now = Utc::now();
        let value = PropertyValue::Date(now);
        assert!(value.matches_type(PropertyType::CreatedTime));
        assert!(value.matches_type(PropertyType::LastEditedTime));
        assert_eq!(value.as_date(), Some(now));
    }
}
