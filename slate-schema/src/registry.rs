//! Per-type behavior: legal filter operators, value coercion, comparison,
//! display rendering, and the type-change compatibility matrix.
//!
//! The registry is a closed dispatch over `PropertyType`. Raw values arrive
//! as duck-typed JSON and are normalized into the `PropertyValue` union;
//! everything downstream works on the union.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::ids::{OptionId, RecordId};
use crate::property::{PropertyType, SelectOption};
use crate::value::PropertyValue;

/// A filter rule operator. Which operators are legal depends on the
/// property type; see [`PropertyTypeRegistry::operators_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    Checked,
    Unchecked,
    ContainsAll,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    /// Wire name of the operator (matches the serialized form and the
    /// bracketed query-parameter grammar).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Before => "before",
            Self::After => "after",
            Self::OnOrBefore => "on_or_before",
            Self::OnOrAfter => "on_or_after",
            Self::Checked => "checked",
            Self::Unchecked => "unchecked",
            Self::ContainsAll => "contains_all",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
        }
    }

    /// Whether the operator carries a comparison value. Presence checks and
    /// checkbox states do not.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Self::IsEmpty | Self::IsNotEmpty | Self::Checked | Self::Unchecked
        )
    }

    /// Whether the operator matches by exclusion. Negated operators fail
    /// open when their rule value cannot be interpreted.
    pub fn is_negated(&self) -> bool {
        matches!(self, Self::NotContains | Self::NotEquals)
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const TEXT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::LessThan,
    FilterOperator::GreaterThanOrEqual,
    FilterOperator::LessThanOrEqual,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const DATE_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Before,
    FilterOperator::After,
    FilterOperator::OnOrBefore,
    FilterOperator::OnOrAfter,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const CHECKBOX_OPERATORS: &[FilterOperator] =
    &[FilterOperator::Checked, FilterOperator::Unchecked];

const SELECT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const MULTI_SELECT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::ContainsAll,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const RELATION_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const USER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const PRESENCE_OPERATORS: &[FilterOperator] =
    &[FilterOperator::IsEmpty, FilterOperator::IsNotEmpty];

/// Closed per-type behavior table. Stateless; construct once and share.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyTypeRegistry;

impl PropertyTypeRegistry {
    pub fn new() -> Self {
        Self
    }

    /// The operators legal for filter rules on a property of this type.
    pub fn operators_for(&self, type_: PropertyType) -> &'static [FilterOperator] {
        match type_ {
            PropertyType::Text | PropertyType::Url | PropertyType::Email | PropertyType::Phone => {
                TEXT_OPERATORS
            }
            PropertyType::Number => NUMBER_OPERATORS,
            PropertyType::Date | PropertyType::CreatedTime | PropertyType::LastEditedTime => {
                DATE_OPERATORS
            }
            PropertyType::Checkbox => CHECKBOX_OPERATORS,
            PropertyType::Select => SELECT_OPERATORS,
            PropertyType::MultiSelect => MULTI_SELECT_OPERATORS,
            PropertyType::Relation => RELATION_OPERATORS,
            PropertyType::CreatedBy | PropertyType::LastEditedBy => USER_OPERATORS,
            PropertyType::Formula | PropertyType::Rollup => PRESENCE_OPERATORS,
        }
    }

    /// Whether the operator is legal for the type.
    pub fn supports_operator(&self, type_: PropertyType, operator: FilterOperator) -> bool {
        self.operators_for(type_).contains(&operator)
    }

    /// Normalize a raw JSON value into the typed union.
    ///
    /// `Ok(None)` means the value was cleared: JSON null, the empty string,
    /// and the empty array all clear. System-populated and computed types
    /// reject writes outright.
    pub fn coerce(&self, type_: PropertyType, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        if type_.is_system() {
            return Err(SchemaError::unsupported(format!(
                "{type_} values are maintained by the store and cannot be written"
            )));
        }
        if type_.is_computed() {
            return Err(SchemaError::unsupported(format!(
                "{type_} values are derived; edit the source properties instead"
            )));
        }
        if raw.is_null() {
            return Ok(None);
        }
        match type_ {
            PropertyType::Text | PropertyType::Url | PropertyType::Email | PropertyType::Phone => {
                self.coerce_text(type_, raw)
            }
            PropertyType::Number => self.coerce_number(raw),
            PropertyType::Select => self.coerce_select(raw),
            PropertyType::MultiSelect => self.coerce_multi_select(raw),
            PropertyType::Date => self.coerce_date(raw),
            PropertyType::Checkbox => self.coerce_checkbox(raw),
            PropertyType::Relation => self.coerce_relation(raw),
            PropertyType::Formula
            | PropertyType::Rollup
            | PropertyType::CreatedTime
            | PropertyType::CreatedBy
            | PropertyType::LastEditedTime
            | PropertyType::LastEditedBy => unreachable!("rejected above"),
        }
    }

    fn coerce_text(&self, type_: PropertyType, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => Ok(Some(PropertyValue::Text(s.clone()))),
            // Scalars stringify; stores are loose about numeric text fields.
            JsonValue::Number(n) => Ok(Some(PropertyValue::Text(n.to_string()))),
            JsonValue::Bool(b) => Ok(Some(PropertyValue::Text(b.to_string()))),
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as {type_}"),
            )),
        }
    }

    fn coerce_number(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        let parsed = match raw {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) if s.trim().is_empty() => return Ok(None),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(Some(PropertyValue::Number(n))),
            _ => Err(SchemaError::validation(
                "value",
                format!("{raw} is not a number"),
            )),
        }
    }

    fn coerce_select(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => Ok(Some(PropertyValue::Select(OptionId::from_string(s)))),
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as an option id"),
            )),
        }
    }

    fn coerce_multi_select(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::Array(items) if items.is_empty() => Ok(None),
            JsonValue::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        JsonValue::String(s) => ids.push(OptionId::from_string(s)),
                        other => {
                            return Err(SchemaError::validation(
                                "value",
                                format!("cannot interpret {other} as an option id"),
                            ))
                        }
                    }
                }
                Ok(Some(PropertyValue::MultiSelect(ids)))
            }
            // A lone scalar wraps, mirroring the SELECT conversion path.
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => Ok(Some(PropertyValue::MultiSelect(vec![
                OptionId::from_string(s),
            ]))),
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as option ids"),
            )),
        }
    }

    fn coerce_date(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::String(s) if s.trim().is_empty() => Ok(None),
            JsonValue::String(s) => parse_date(s.trim())
                .map(|dt| Some(PropertyValue::Date(dt)))
                .ok_or_else(|| {
                    SchemaError::validation("value", format!("'{s}' is not a valid date"))
                }),
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| Some(PropertyValue::Date(dt)))
                .ok_or_else(|| {
                    SchemaError::validation("value", format!("{n} is not a valid timestamp"))
                }),
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as a date"),
            )),
        }
    }

    fn coerce_checkbox(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::Bool(b) => Ok(Some(PropertyValue::Checkbox(*b))),
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => match s.as_str() {
                "true" => Ok(Some(PropertyValue::Checkbox(true))),
                "false" => Ok(Some(PropertyValue::Checkbox(false))),
                _ => Err(SchemaError::validation(
                    "value",
                    format!("'{s}' is not a checkbox state"),
                )),
            },
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as a checkbox state"),
            )),
        }
    }

    fn coerce_relation(&self, raw: &JsonValue) -> Result<Option<PropertyValue>> {
        match raw {
            JsonValue::Array(items) if items.is_empty() => Ok(None),
            JsonValue::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        JsonValue::String(s) => ids.push(RecordId::from_string(s)),
                        other => {
                            return Err(SchemaError::validation(
                                "value",
                                format!("cannot interpret {other} as a record id"),
                            ))
                        }
                    }
                }
                Ok(Some(PropertyValue::Relation(ids)))
            }
            JsonValue::String(s) if s.is_empty() => Ok(None),
            JsonValue::String(s) => Ok(Some(PropertyValue::Relation(vec![
                RecordId::from_string(s),
            ]))),
            other => Err(SchemaError::validation(
                "value",
                format!("cannot interpret {other} as record ids"),
            )),
        }
    }

    /// Render a value for display. Select shapes resolve option names via
    /// `options`; raw ids render as-is when unresolvable. Never fails:
    /// orphaned and shape-mismatched values render by their stored shape.
    pub fn display_value(
        &self,
        type_: PropertyType,
        value: Option<&PropertyValue>,
        options: Option<&[SelectOption]>,
    ) -> String {
        let Some(value) = value else {
            return String::new();
        };
        if !value.matches_type(type_) {
            trace!(
                declared = %type_,
                stored = value.shape(),
                "value shape does not match declared type, rendering by shape"
            );
        }
        match value {
            PropertyValue::Text(s) | PropertyValue::User(s) => s.clone(),
            PropertyValue::Number(n) => display_number(*n),
            PropertyValue::Select(id) => display_option(id, options),
            PropertyValue::MultiSelect(ids) => ids
                .iter()
                .map(|id| display_option(id, options))
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Date(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            PropertyValue::Checkbox(b) => b.to_string(),
            PropertyValue::Relation(ids) => ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Total order over optional values. Missing values sort first; defined
    /// values compare per type, with select shapes ranked by option order
    /// when options are supplied (unknown ids rank after known ones).
    pub fn compare(
        &self,
        type_: PropertyType,
        a: Option<&PropertyValue>,
        b: Option<&PropertyValue>,
        options: Option<&[SelectOption]>,
    ) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self.compare_defined(type_, a, b, options),
        }
    }

    fn compare_defined(
        &self,
        type_: PropertyType,
        a: &PropertyValue,
        b: &PropertyValue,
        options: Option<&[SelectOption]>,
    ) -> Ordering {
        use PropertyValue as V;
        match (a, b) {
            (V::Text(x), V::Text(y)) => x.cmp(y),
            (V::User(x), V::User(y)) => x.cmp(y),
            (V::Number(x), V::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            (V::Date(x), V::Date(y)) => x.cmp(y),
            (V::Checkbox(x), V::Checkbox(y)) => x.cmp(y),
            (V::Select(x), V::Select(y)) => option_rank(x, options).cmp(&option_rank(y, options)),
            (V::MultiSelect(xs), V::MultiSelect(ys)) => {
                let xr: Vec<_> = xs.iter().map(|id| option_rank(id, options)).collect();
                let yr: Vec<_> = ys.iter().map(|id| option_rank(id, options)).collect();
                xr.cmp(&yr)
            }
            (V::Relation(xs), V::Relation(ys)) => xs.cmp(ys),
            // Mixed shapes (historical values after a type change, computed
            // results) fall back to display-string order.
            _ => self
                .display_value(type_, Some(a), options)
                .cmp(&self.display_value(type_, Some(b), options)),
        }
    }

    /// Whether a property may change type from `from` to `to`.
    pub fn can_convert(&self, from: PropertyType, to: PropertyType) -> bool {
        if from == to {
            return true;
        }
        if from.is_text_like() && to.is_text_like() {
            return true;
        }
        matches!(
            (from, to),
            (PropertyType::Select, PropertyType::MultiSelect)
                | (PropertyType::MultiSelect, PropertyType::Select)
        )
    }

    /// Fail-fast form of [`can_convert`](Self::can_convert).
    pub fn check_convert(&self, from: PropertyType, to: PropertyType) -> Result<()> {
        if self.can_convert(from, to) {
            Ok(())
        } else {
            Err(SchemaError::TypeConversion { from, to })
        }
    }

    /// Migrate a stored value across an allowed type change. `None` means
    /// the conversion cleared the value. Values the conversion cannot
    /// reshape (a multi-select with several entries narrowing to SELECT)
    /// are left as-is; renderers tolerate them.
    pub fn convert_value(
        &self,
        value: PropertyValue,
        from: PropertyType,
        to: PropertyType,
    ) -> Option<PropertyValue> {
        if from == to || (from.is_text_like() && to.is_text_like()) {
            return Some(value);
        }
        match (from, to, value) {
            (PropertyType::Select, PropertyType::MultiSelect, PropertyValue::Select(id)) => {
                Some(PropertyValue::MultiSelect(vec![id]))
            }
            (PropertyType::MultiSelect, PropertyType::Select, PropertyValue::MultiSelect(ids)) => {
                match ids.len() {
                    0 => None,
                    1 => ids.into_iter().next().map(PropertyValue::Select),
                    _ => Some(PropertyValue::MultiSelect(ids)),
                }
            }
            (_, _, value) => Some(value),
        }
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn display_option(id: &OptionId, options: Option<&[SelectOption]>) -> String {
    options
        .and_then(|opts| opts.iter().find(|o| &o.id == id))
        .map(|o| o.name.clone())
        .unwrap_or_else(|| id.as_str().to_string())
}

fn option_rank<'a>(id: &'a OptionId, options: Option<&[SelectOption]>) -> (usize, &'a str) {
    let index = options
        .and_then(|opts| opts.iter().position(|o| &o.id == id))
        .unwrap_or(usize::MAX);
    (index, id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> PropertyTypeRegistry {
        PropertyTypeRegistry::new()
    }

    fn status_options() -> Vec<SelectOption> {
        vec![
            SelectOption::with_id("a", "Todo").with_order(0),
            SelectOption::with_id("b", "Doing").with_order(1),
            SelectOption::with_id("c", "Done").with_order(2),
        ]
    }

    #[test]
    fn operator_sets_per_type() {
        let r = registry();
        assert!(r.supports_operator(PropertyType::Text, FilterOperator::StartsWith));
        assert!(r.supports_operator(PropertyType::Url, FilterOperator::Contains));
        assert!(r.supports_operator(PropertyType::Number, FilterOperator::GreaterThan));
        assert!(r.supports_operator(PropertyType::Date, FilterOperator::OnOrAfter));
        assert!(r.supports_operator(PropertyType::MultiSelect, FilterOperator::ContainsAll));
        assert!(!r.supports_operator(PropertyType::Select, FilterOperator::Contains));
        assert!(!r.supports_operator(PropertyType::Number, FilterOperator::StartsWith));
        assert_eq!(
            r.operators_for(PropertyType::Checkbox),
            &[FilterOperator::Checked, FilterOperator::Unchecked]
        );
    }

    #[test]
    fn operator_wire_names_round_trip() {
        let json = serde_json::to_string(&FilterOperator::GreaterThanOrEqual).unwrap();
        assert_eq!(json, "\"greater_than_or_equal\"");
        let parsed: FilterOperator = serde_json::from_str("\"on_or_before\"").unwrap();
        assert_eq!(parsed, FilterOperator::OnOrBefore);
        assert_eq!(FilterOperator::NotContains.as_str(), "not_contains");
    }

    #[test]
    fn null_and_empty_clear() {
        let r = registry();
        assert_eq!(r.coerce(PropertyType::Text, &json!(null)).unwrap(), None);
        assert_eq!(r.coerce(PropertyType::Text, &json!("")).unwrap(), None);
        assert_eq!(r.coerce(PropertyType::Number, &json!("")).unwrap(), None);
        assert_eq!(
            r.coerce(PropertyType::MultiSelect, &json!([])).unwrap(),
            None
        );
        assert_eq!(r.coerce(PropertyType::Relation, &json!([])).unwrap(), None);
    }

    #[test]
    fn number_coercion() {
        let r = registry();
        assert_eq!(
            r.coerce(PropertyType::Number, &json!(42)).unwrap(),
            Some(PropertyValue::Number(42.0))
        );
        assert_eq!(
            r.coerce(PropertyType::Number, &json!(" 3.5 ")).unwrap(),
            Some(PropertyValue::Number(3.5))
        );
        assert!(r.coerce(PropertyType::Number, &json!("abc")).is_err());
        assert!(r.coerce(PropertyType::Number, &json!(true)).is_err());
    }

    #[test]
    fn date_coercion_accepts_three_formats() {
        let r = registry();
        let rfc = r
            .coerce(PropertyType::Date, &json!("2024-03-01T12:30:00Z"))
            .unwrap()
            .unwrap();
        let day = r
            .coerce(PropertyType::Date, &json!("2024-03-01"))
            .unwrap()
            .unwrap();
        let epoch = r
            .coerce(PropertyType::Date, &json!(1709296200000i64))
            .unwrap()
            .unwrap();
        assert_eq!(
            rfc.as_date().unwrap().to_rfc3339_opts(SecondsFormat::Secs, true),
            "2024-03-01T12:30:00Z"
        );
        assert_eq!(
            day.as_date().unwrap().to_rfc3339_opts(SecondsFormat::Secs, true),
            "2024-03-01T00:00:00Z"
        );
        assert!(epoch.as_date().is_some());
        assert!(r.coerce(PropertyType::Date, &json!("not a date")).is_err());
    }

    #[test]
    fn checkbox_coercion() {
        let r = registry();
        assert_eq!(
            r.coerce(PropertyType::Checkbox, &json!(true)).unwrap(),
            Some(PropertyValue::Checkbox(true))
        );
        assert_eq!(
            r.coerce(PropertyType::Checkbox, &json!("false")).unwrap(),
            Some(PropertyValue::Checkbox(false))
        );
        assert!(r.coerce(PropertyType::Checkbox, &json!("yes")).is_err());
    }

    #[test]
    fn select_and_multi_select_coercion() {
        let r = registry();
        assert_eq!(
            r.coerce(PropertyType::Select, &json!("b")).unwrap(),
            Some(PropertyValue::Select(OptionId::from_string("b")))
        );
        assert_eq!(
            r.coerce(PropertyType::MultiSelect, &json!(["a", "c"])).unwrap(),
            Some(PropertyValue::MultiSelect(vec![
                OptionId::from_string("a"),
                OptionId::from_string("c"),
            ]))
        );
        // A bare scalar wraps into a one-element list.
        assert_eq!(
            r.coerce(PropertyType::MultiSelect, &json!("a")).unwrap(),
            Some(PropertyValue::MultiSelect(vec![OptionId::from_string("a")]))
        );
        assert!(r.coerce(PropertyType::Select, &json!(7)).is_err());
    }

    #[test]
    fn system_and_computed_types_reject_writes() {
        let r = registry();
        for type_ in [
            PropertyType::Formula,
            PropertyType::Rollup,
            PropertyType::CreatedTime,
            PropertyType::CreatedBy,
            PropertyType::LastEditedTime,
            PropertyType::LastEditedBy,
        ] {
            let err = r.coerce(type_, &json!("x")).unwrap_err();
            assert!(
                matches!(err, SchemaError::UnsupportedOperation { .. }),
                "{type_} accepted a write"
            );
        }
    }

    #[test]
    fn display_renders_option_names_and_tolerates_unknown_ids() {
        let r = registry();
        let options = status_options();
        let value = PropertyValue::Select(OptionId::from_string("b"));
        assert_eq!(
            r.display_value(PropertyType::Select, Some(&value), Some(&options)),
            "Doing"
        );
        let orphan = PropertyValue::Select(OptionId::from_string("zzz"));
        assert_eq!(
            r.display_value(PropertyType::Select, Some(&orphan), Some(&options)),
            "zzz"
        );
        let multi = PropertyValue::MultiSelect(vec![
            OptionId::from_string("c"),
            OptionId::from_string("a"),
        ]);
        assert_eq!(
            r.display_value(PropertyType::MultiSelect, Some(&multi), Some(&options)),
            "Done, Todo"
        );
        assert_eq!(r.display_value(PropertyType::Text, None, None), "");
    }

    #[test]
    fn display_trims_integral_numbers() {
        let r = registry();
        assert_eq!(
            r.display_value(PropertyType::Number, Some(&PropertyValue::Number(3.0)), None),
            "3"
        );
        assert_eq!(
            r.display_value(PropertyType::Number, Some(&PropertyValue::Number(3.25)), None),
            "3.25"
        );
    }

    #[test]
    fn display_tolerates_shape_mismatch() {
        // A value left behind by a deleted or retyped property renders by
        // its stored shape instead of crashing.
        let r = registry();
        let stale = PropertyValue::Text("legacy".into());
        assert_eq!(
            r.display_value(PropertyType::Number, Some(&stale), None),
            "legacy"
        );
    }

    #[test]
    fn coerce_display_round_trips() {
        let r = registry();
        let cases = [
            (PropertyType::Text, json!("hello")),
            (PropertyType::Number, json!(42)),
            (PropertyType::Number, json!(2.5)),
            (PropertyType::Date, json!("2024-03-01T12:30:00Z")),
            (PropertyType::Checkbox, json!(true)),
        ];
        for (type_, raw) in cases {
            let value = r.coerce(type_, &raw).unwrap().unwrap();
            let rendered = r.display_value(type_, Some(&value), None);
            let again = r.coerce(type_, &json!(rendered)).unwrap().unwrap();
            assert_eq!(again, value, "{type_} did not round-trip via {raw}");
        }
    }

    #[test]
    fn missing_values_sort_first() {
        let r = registry();
        let defined = PropertyValue::Number(1.0);
        assert_eq!(
            r.compare(PropertyType::Number, None, Some(&defined), None),
            Ordering::Less
        );
        assert_eq!(
            r.compare(PropertyType::Number, Some(&defined), None, None),
            Ordering::Greater
        );
        assert_eq!(r.compare(PropertyType::Number, None, None, None), Ordering::Equal);
    }

    #[test]
    fn select_compares_by_option_order() {
        let r = registry();
        let options = status_options();
        let todo = PropertyValue::Select(OptionId::from_string("a"));
        let done = PropertyValue::Select(OptionId::from_string("c"));
        let orphan = PropertyValue::Select(OptionId::from_string("zzz"));
        assert_eq!(
            r.compare(PropertyType::Select, Some(&todo), Some(&done), Some(&options)),
            Ordering::Less
        );
        // Unknown option ids rank after every known one.
        assert_eq!(
            r.compare(PropertyType::Select, Some(&orphan), Some(&done), Some(&options)),
            Ordering::Greater
        );
    }

    #[test]
    fn mixed_shapes_compare_without_panicking() {
        let r = registry();
        let text = PropertyValue::Text("b".into());
        let number = PropertyValue::Number(1.0);
        // Deterministic either way; the point is totality.
        let forward = r.compare(PropertyType::Number, Some(&text), Some(&number), None);
        let reverse = r.compare(PropertyType::Number, Some(&number), Some(&text), None);
        assert_eq!(forward, reverse.reverse());
    }

    #[test]
    fn conversion_matrix() {
        let r = registry();
        assert!(r.can_convert(PropertyType::Text, PropertyType::Email));
        assert!(r.can_convert(PropertyType::Url, PropertyType::Phone));
        assert!(r.can_convert(PropertyType::Select, PropertyType::MultiSelect));
        assert!(r.can_convert(PropertyType::MultiSelect, PropertyType::Select));
        assert!(r.can_convert(PropertyType::Date, PropertyType::Date));
        assert!(!r.can_convert(PropertyType::Select, PropertyType::Number));
        assert!(!r.can_convert(PropertyType::Number, PropertyType::Date));
        assert!(!r.can_convert(PropertyType::Checkbox, PropertyType::Text));
        assert!(!r.can_convert(PropertyType::Text, PropertyType::Formula));
        assert!(!r.can_convert(PropertyType::Text, PropertyType::CreatedTime));
    }

    #[test]
    fn check_convert_names_both_types() {
        let err = registry()
            .check_convert(PropertyType::Select, PropertyType::Number)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot convert property type SELECT to NUMBER"
        );
    }

    #[test]
    fn convert_value_reshapes_selects() {
        let r = registry();
        let scalar = PropertyValue::Select(OptionId::from_string("a"));
        assert_eq!(
            r.convert_value(scalar, PropertyType::Select, PropertyType::MultiSelect),
            Some(PropertyValue::MultiSelect(vec![OptionId::from_string("a")]))
        );
        let single = PropertyValue::MultiSelect(vec![OptionId::from_string("a")]);
        assert_eq!(
            r.convert_value(single, PropertyType::MultiSelect, PropertyType::Select),
            Some(PropertyValue::Select(OptionId::from_string("a")))
        );
        // Narrowing a multi-valued cell leaves the stored value untouched.
        let wide = PropertyValue::MultiSelect(vec![
            OptionId::from_string("a"),
            OptionId::from_string("b"),
        ]);
        assert_eq!(
            r.convert_value(wide.clone(), PropertyType::MultiSelect, PropertyType::Select),
            Some(wide)
        );
        assert_eq!(
            r.convert_value(
                PropertyValue::MultiSelect(vec![]),
                PropertyType::MultiSelect,
                PropertyType::Select
            ),
            None
        );
    }
}
