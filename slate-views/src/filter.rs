//! Filter evaluation: does a record pass a view's rules?
//!
//! Rules compose with AND only. Evaluation fails open wherever a saved rule
//! has drifted from the schema: a rule referencing a deleted property, or an
//! operator no longer legal after a type change, passes every record rather
//! than blanking the view.

use tracing::trace;

use slate_schema::{
    FilterOperator, FilterRule, PropertyType, PropertyTypeRegistry, PropertyValue, Record, Schema,
    SelectOption,
};

/// Evaluates filter rules against records. Stateless; construct once.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine {
    registry: PropertyTypeRegistry,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self {
            registry: PropertyTypeRegistry::new(),
        }
    }

    /// True iff the record passes every rule. An empty rule set passes
    /// everything. Rules run in `order` priority; under AND the result is
    /// order-independent, the ordering only shapes trace output.
    pub fn matches(&self, schema: &Schema, filters: &[FilterRule], record: &Record) -> bool {
        let mut rules: Vec<&FilterRule> = filters.iter().collect();
        rules.sort_by_key(|r| r.order);
        rules.iter().all(|rule| self.rule_matches(schema, rule, record))
    }

    fn rule_matches(&self, schema: &Schema, rule: &FilterRule, record: &Record) -> bool {
        let Some(property) = schema.property(&rule.property) else {
            // The property was deleted after the view was saved.
            trace!(property = %rule.property, "filter rule references unknown property, passing");
            return true;
        };
        let type_ = property.type_;
        if !self.registry.supports_operator(type_, rule.operator) {
            // A type change made the saved operator illegal.
            trace!(
                property = %rule.property,
                operator = %rule.operator,
                %type_,
                "operator not legal for property type, passing"
            );
            return true;
        }

        let value = record.value(&rule.property);
        match rule.operator {
            FilterOperator::IsEmpty => value.map_or(true, |v| v.is_empty()),
            FilterOperator::IsNotEmpty => value.is_some_and(|v| !v.is_empty()),
            FilterOperator::Checked => value.and_then(|v| v.as_checkbox()).unwrap_or(false),
            FilterOperator::Unchecked => !value.and_then(|v| v.as_checkbox()).unwrap_or(false),
            operator => {
                let rule_value = match self.registry.coerce(type_, &rule.value) {
                    Ok(Some(v)) => v,
                    // A rule value that cannot be read as the property's
                    // current type matches nothing, or everything when the
                    // operator is negated.
                    Ok(None) | Err(_) => {
                        trace!(
                            property = %rule.property,
                            operator = %operator,
                            "rule value not interpretable, failing closed"
                        );
                        return operator.is_negated();
                    }
                };
                self.evaluate(property.options(), type_, operator, value, &rule_value)
            }
        }
    }

    fn evaluate(
        &self,
        options: Option<&[SelectOption]>,
        type_: PropertyType,
        operator: FilterOperator,
        value: Option<&PropertyValue>,
        rule_value: &PropertyValue,
    ) -> bool {
        // A select rule naming an option the property no longer offers
        // matches no record at all.
        if type_ == PropertyType::Select {
            if let PropertyValue::Select(id) = rule_value {
                let known = options.is_some_and(|opts| opts.iter().any(|o| &o.id == id));
                if !known {
                    return operator.is_negated();
                }
            }
        }

        let Some(value) = value else {
            // Missing values satisfy only negated operators.
            return operator.is_negated();
        };

        match operator {
            FilterOperator::Equals => self.equal(type_, value, rule_value, options),
            FilterOperator::NotEquals => !self.equal(type_, value, rule_value, options),
            FilterOperator::Contains => self.contains(value, rule_value).unwrap_or(false),
            FilterOperator::NotContains => !self.contains(value, rule_value).unwrap_or(false),
            FilterOperator::StartsWith => match (value.as_text(), rule_value.as_text()) {
                (Some(haystack), Some(prefix)) => haystack.starts_with(prefix),
                _ => false,
            },
            FilterOperator::EndsWith => match (value.as_text(), rule_value.as_text()) {
                (Some(haystack), Some(suffix)) => haystack.ends_with(suffix),
                _ => false,
            },
            FilterOperator::GreaterThan | FilterOperator::After => {
                self.ordering(type_, value, rule_value, options).is_gt()
            }
            FilterOperator::LessThan | FilterOperator::Before => {
                self.ordering(type_, value, rule_value, options).is_lt()
            }
            FilterOperator::GreaterThanOrEqual | FilterOperator::OnOrAfter => {
                self.ordering(type_, value, rule_value, options).is_ge()
            }
            FilterOperator::LessThanOrEqual | FilterOperator::OnOrBefore => {
                self.ordering(type_, value, rule_value, options).is_le()
            }
            FilterOperator::ContainsAll => match (value.as_multi_select(), rule_value.as_multi_select()) {
                (Some(have), Some(want)) => want.iter().all(|id| have.contains(id)),
                _ => false,
            },
            // Presence and checkbox operators are handled before coercion.
            FilterOperator::IsEmpty
            | FilterOperator::IsNotEmpty
            | FilterOperator::Checked
            | FilterOperator::Unchecked => true,
        }
    }

    fn equal(
        &self,
        type_: PropertyType,
        a: &PropertyValue,
        b: &PropertyValue,
        options: Option<&[SelectOption]>,
    ) -> bool {
        self.registry.compare(type_, Some(a), Some(b), options).is_eq()
    }

    fn ordering(
        &self,
        type_: PropertyType,
        a: &PropertyValue,
        b: &PropertyValue,
        options: Option<&[SelectOption]>,
    ) -> std::cmp::Ordering {
        self.registry.compare(type_, Some(a), Some(b), options)
    }

    /// Membership test for list-shaped and text values. `None` means the
    /// shapes do not support containment, which positive operators read as
    /// no-match and negated ones as match.
    fn contains(&self, value: &PropertyValue, rule_value: &PropertyValue) -> Option<bool> {
        match (value, rule_value) {
            (PropertyValue::Text(haystack), PropertyValue::Text(needle)) => {
                Some(haystack.contains(needle.as_str()))
            }
            (PropertyValue::MultiSelect(have), PropertyValue::MultiSelect(want)) => {
                Some(want.iter().any(|id| have.contains(id)))
            }
            (PropertyValue::MultiSelect(have), PropertyValue::Select(id)) => {
                Some(have.contains(id))
            }
            (PropertyValue::Relation(have), PropertyValue::Relation(want)) => {
                Some(want.iter().any(|id| have.contains(id)))
            }
            _ => None,
        }
    }

    /// Case-insensitive substring search across every displayable value of
    /// the record. Used as the local fallback when a store cannot search
    /// server-side. An empty query matches everything.
    pub fn search_matches(&self, schema: &Schema, record: &Record, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        schema.properties.iter().any(|property| {
            let rendered = self.registry.display_value(
                property.type_,
                record.value(&property.id),
                property.options(),
            );
            rendered.to_lowercase().contains(&needle)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slate_schema::{Property, SelectOption};

    fn schema() -> Schema {
        Schema::with_id("tasks", "Tasks")
            .with_property(Property::with_id("title", "Title", PropertyType::Text))
            .with_property(Property::with_id("estimate", "Estimate", PropertyType::Number))
            .with_property(Property::with_id("due", "Due", PropertyType::Date))
            .with_property(Property::with_id("done", "Done", PropertyType::Checkbox))
            .with_property(
                Property::with_id("status", "Status", PropertyType::Select).with_options(vec![
                    SelectOption::with_id("a", "Todo"),
                    SelectOption::with_id("b", "Done"),
                ]),
            )
            .with_property(
                Property::with_id("tags", "Tags", PropertyType::MultiSelect).with_options(vec![
                    SelectOption::with_id("t1", "urgent"),
                    SelectOption::with_id("t2", "home"),
                    SelectOption::with_id("t3", "work"),
                ]),
            )
    }

    fn record(values: &[(&str, PropertyValue)]) -> Record {
        let mut record = Record::new();
        for (id, value) in values {
            record = record.with_value(*id, value.clone());
        }
        record
    }

    fn select(id: &str) -> PropertyValue {
        PropertyValue::Select(id.into())
    }

    fn multi(ids: &[&str]) -> PropertyValue {
        PropertyValue::MultiSelect(ids.iter().map(|s| (*s).into()).collect())
    }

    #[test]
    fn select_equals_matches_only_the_chosen_option() {
        let schema = schema();
        let engine = FilterEngine::new();
        let rule = vec![FilterRule::new("status", FilterOperator::Equals).with_value(json!("b"))];
        let done = record(&[("status", select("b"))]);
        let todo = record(&[("status", select("a"))]);
        assert!(engine.matches(&schema, &rule, &done));
        assert!(!engine.matches(&schema, &rule, &todo));
    }

    #[test]
    fn rules_compose_with_and_and_empty_set_passes() {
        let schema = schema();
        let engine = FilterEngine::new();
        let rules = vec![
            FilterRule::new("status", FilterOperator::Equals).with_value(json!("b")),
            FilterRule::new("done", FilterOperator::Checked),
        ];
        let both = record(&[("status", select("b")), ("done", PropertyValue::Checkbox(true))]);
        let one = record(&[("status", select("b")), ("done", PropertyValue::Checkbox(false))]);

        assert!(engine.matches(&schema, &rules, &both));
        assert!(!engine.matches(&schema, &rules, &one));
        // Conjunction: the full set passes exactly when each singleton does.
        for rule in &rules {
            let singleton = std::slice::from_ref(rule);
            assert!(
                engine.matches(&schema, singleton, &both),
                "singleton {rule:?} should pass"
            );
        }
        assert!(engine.matches(&schema, &[], &one));
    }

    #[test]
    fn stale_property_reference_fails_open() {
        let schema = schema();
        let engine = FilterEngine::new();
        let stale =
            vec![FilterRule::new("deleted", FilterOperator::Equals).with_value(json!("x"))];
        let records = [
            record(&[("title", PropertyValue::Text("a".into()))]),
            record(&[("estimate", PropertyValue::Number(2.0))]),
            record(&[]),
        ];
        for r in &records {
            assert!(engine.matches(&schema, &stale, r));
        }
    }

    #[test]
    fn illegal_operator_after_type_change_fails_open() {
        // A saved starts_with rule survives the property turning NUMBER.
        let mut schema = schema();
        schema
            .property_mut(&"title".into())
            .unwrap()
            .type_ = PropertyType::Number;
        let engine = FilterEngine::new();
        let rules =
            vec![FilterRule::new("title", FilterOperator::StartsWith).with_value(json!("a"))];
        assert!(engine.matches(&schema, &rules, &record(&[("title", PropertyValue::Number(1.0))])));
    }

    #[test]
    fn uninterpretable_rule_value_matches_nothing_unless_negated() {
        let schema = schema();
        let engine = FilterEngine::new();
        let r = record(&[("estimate", PropertyValue::Number(3.0))]);
        let positive =
            vec![FilterRule::new("estimate", FilterOperator::Equals).with_value(json!("abc"))];
        let negated =
            vec![FilterRule::new("estimate", FilterOperator::NotEquals).with_value(json!("abc"))];
        assert!(!engine.matches(&schema, &positive, &r));
        assert!(engine.matches(&schema, &negated, &r));
    }

    #[test]
    fn missing_values_satisfy_only_negated_operators() {
        let schema = schema();
        let engine = FilterEngine::new();
        let empty = record(&[]);
        let equals =
            vec![FilterRule::new("title", FilterOperator::Equals).with_value(json!("x"))];
        let not_equals =
            vec![FilterRule::new("title", FilterOperator::NotEquals).with_value(json!("x"))];
        let contains =
            vec![FilterRule::new("title", FilterOperator::Contains).with_value(json!("x"))];
        let is_empty = vec![FilterRule::new("title", FilterOperator::IsEmpty)];
        let is_not_empty = vec![FilterRule::new("title", FilterOperator::IsNotEmpty)];

        assert!(!engine.matches(&schema, &equals, &empty));
        assert!(engine.matches(&schema, &not_equals, &empty));
        assert!(!engine.matches(&schema, &contains, &empty));
        assert!(engine.matches(&schema, &is_empty, &empty));
        assert!(!engine.matches(&schema, &is_not_empty, &empty));
    }

    #[test]
    fn unknown_select_option_matches_nothing_and_not_equals_everything() {
        let schema = schema();
        let engine = FilterEngine::new();
        // "zzz" is not among the status options; a record may still hold it.
        let orphan = record(&[("status", select("zzz"))]);
        let equals =
            vec![FilterRule::new("status", FilterOperator::Equals).with_value(json!("zzz"))];
        let not_equals =
            vec![FilterRule::new("status", FilterOperator::NotEquals).with_value(json!("zzz"))];
        assert!(!engine.matches(&schema, &equals, &orphan));
        assert!(engine.matches(&schema, &not_equals, &orphan));
        assert!(engine.matches(&schema, &not_equals, &record(&[("status", select("a"))])));
    }

    #[test]
    fn checkbox_operators_treat_missing_as_unchecked() {
        let schema = schema();
        let engine = FilterEngine::new();
        let checked = vec![FilterRule::new("done", FilterOperator::Checked)];
        let unchecked = vec![FilterRule::new("done", FilterOperator::Unchecked)];
        let ticked = record(&[("done", PropertyValue::Checkbox(true))]);
        let blank = record(&[]);
        assert!(engine.matches(&schema, &checked, &ticked));
        assert!(!engine.matches(&schema, &checked, &blank));
        assert!(engine.matches(&schema, &unchecked, &blank));
    }

    #[test]
    fn number_range_operators() {
        let schema = schema();
        let engine = FilterEngine::new();
        let r = record(&[("estimate", PropertyValue::Number(5.0))]);
        let gt = |v: i64| {
            vec![FilterRule::new("estimate", FilterOperator::GreaterThan).with_value(json!(v))]
        };
        let lte = |v: i64| {
            vec![FilterRule::new("estimate", FilterOperator::LessThanOrEqual).with_value(json!(v))]
        };
        assert!(engine.matches(&schema, &gt(4), &r));
        assert!(!engine.matches(&schema, &gt(5), &r));
        assert!(engine.matches(&schema, &lte(5), &r));
        assert!(!engine.matches(&schema, &lte(4), &r));
    }

    #[test]
    fn date_operators_compare_instants() {
        let schema = schema();
        let engine = FilterEngine::new();
        let registry = PropertyTypeRegistry::new();
        let due = registry
            .coerce(PropertyType::Date, &json!("2024-06-15"))
            .unwrap()
            .unwrap();
        let r = record(&[("due", due)]);
        let before =
            vec![FilterRule::new("due", FilterOperator::Before).with_value(json!("2024-07-01"))];
        let after =
            vec![FilterRule::new("due", FilterOperator::After).with_value(json!("2024-07-01"))];
        let on_or_after = vec![
            FilterRule::new("due", FilterOperator::OnOrAfter).with_value(json!("2024-06-15")),
        ];
        assert!(engine.matches(&schema, &before, &r));
        assert!(!engine.matches(&schema, &after, &r));
        assert!(engine.matches(&schema, &on_or_after, &r));
    }

    #[test]
    fn text_prefix_suffix_and_contains() {
        let schema = schema();
        let engine = FilterEngine::new();
        let r = record(&[("title", PropertyValue::Text("Read the manual".into()))]);
        let starts =
            vec![FilterRule::new("title", FilterOperator::StartsWith).with_value(json!("Read"))];
        let ends =
            vec![FilterRule::new("title", FilterOperator::EndsWith).with_value(json!("manual"))];
        let contains =
            vec![FilterRule::new("title", FilterOperator::Contains).with_value(json!("the"))];
        let not_contains = vec![
            FilterRule::new("title", FilterOperator::NotContains).with_value(json!("audio")),
        ];
        assert!(engine.matches(&schema, &starts, &r));
        assert!(engine.matches(&schema, &ends, &r));
        assert!(engine.matches(&schema, &contains, &r));
        assert!(engine.matches(&schema, &not_contains, &r));
    }

    #[test]
    fn multi_select_contains_and_contains_all() {
        let schema = schema();
        let engine = FilterEngine::new();
        let r = record(&[("tags", multi(&["t1", "t3"]))]);
        let contains =
            vec![FilterRule::new("tags", FilterOperator::Contains).with_value(json!("t1"))];
        let all_present = vec![
            FilterRule::new("tags", FilterOperator::ContainsAll).with_value(json!(["t1", "t3"])),
        ];
        let all_missing_one = vec![
            FilterRule::new("tags", FilterOperator::ContainsAll).with_value(json!(["t1", "t2"])),
        ];
        let not_contains =
            vec![FilterRule::new("tags", FilterOperator::NotContains).with_value(json!("t2"))];
        assert!(engine.matches(&schema, &contains, &r));
        assert!(engine.matches(&schema, &all_present, &r));
        assert!(!engine.matches(&schema, &all_missing_one, &r));
        assert!(engine.matches(&schema, &not_contains, &r));
    }

    #[test]
    fn search_is_case_insensitive_and_spans_properties() {
        let schema = schema();
        let engine = FilterEngine::new();
        let r = record(&[
            ("title", PropertyValue::Text("Grocery run".into())),
            ("status", select("a")),
        ]);
        assert!(engine.search_matches(&schema, &r, "GROCERY"));
        // Select values search by display name, not option id.
        assert!(engine.search_matches(&schema, &r, "todo"));
        assert!(!engine.search_matches(&schema, &r, "a"));
        assert!(engine.search_matches(&schema, &r, "  "));
        assert!(!engine.search_matches(&schema, &r, "missing"));
    }
}
