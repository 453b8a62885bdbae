//! Multi-key record ordering.
//!
//! Sorting is stable: records tied on every rule keep their input order.
//! Missing values sort first under both directions; direction flips only
//! how defined values compare. A rule referencing a deleted property is
//! skipped rather than failing the sort.

use std::borrow::Borrow;
use std::cmp::Ordering;

use tracing::trace;

use slate_schema::{PropertyTypeRegistry, Record, Schema, SortDirection, SortRule};

/// Orders records by a view's sort rules. Stateless; construct once.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortEngine {
    registry: PropertyTypeRegistry,
}

impl SortEngine {
    pub fn new() -> Self {
        Self {
            registry: PropertyTypeRegistry::new(),
        }
    }

    /// Stable in-place sort. Works over owned records and over borrowed
    /// projection rows alike.
    pub fn sort_records<R: Borrow<Record>>(
        &self,
        schema: &Schema,
        sorts: &[SortRule],
        records: &mut [R],
    ) {
        if sorts.is_empty() {
            return;
        }
        let mut rules: Vec<&SortRule> = sorts.iter().collect();
        rules.sort_by_key(|r| r.order);
        records.sort_by(|a, b| self.compare_records(schema, &rules, a.borrow(), b.borrow()));
    }

    /// Compare two records under the given rules, primary rule first.
    fn compare_records(
        &self,
        schema: &Schema,
        rules: &[&SortRule],
        a: &Record,
        b: &Record,
    ) -> Ordering {
        for rule in rules {
            let Some(property) = schema.property(&rule.property) else {
                trace!(property = %rule.property, "sort rule references unknown property, skipping");
                continue;
            };
            let left = a.value(&rule.property);
            let right = b.value(&rule.property);
            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                // Nulls first regardless of direction.
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(l), Some(r)) => {
                    let defined = self.registry.compare(
                        property.type_,
                        Some(l),
                        Some(r),
                        property.options(),
                    );
                    match rule.direction {
                        SortDirection::Asc => defined,
                        SortDirection::Desc => defined.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_schema::{Property, PropertyType, PropertyValue, SelectOption};

    fn schema() -> Schema {
        Schema::with_id("tasks", "Tasks")
            .with_property(Property::with_id("name", "Name", PropertyType::Text))
            .with_property(Property::with_id("priority", "Priority", PropertyType::Number))
            .with_property(
                Property::with_id("status", "Status", PropertyType::Select).with_options(vec![
                    SelectOption::with_id("todo", "Todo"),
                    SelectOption::with_id("doing", "Doing"),
                    SelectOption::with_id("done", "Done"),
                ]),
            )
    }

    fn task(id: &str, name: &str, priority: Option<f64>) -> Record {
        let mut record = Record::with_id(id).with_value("name", PropertyValue::Text(name.into()));
        if let Some(p) = priority {
            record = record.with_value("priority", PropertyValue::Number(p));
        }
        record
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn secondary_rule_breaks_primary_ties() {
        let schema = schema();
        let engine = SortEngine::new();
        let mut records = vec![
            task("r1", "zebra", Some(2.0)),
            task("r2", "apple", Some(2.0)),
            task("r3", "mango", Some(5.0)),
        ];
        let sorts = vec![
            SortRule::new("priority", SortDirection::Desc).with_order(0),
            SortRule::new("name", SortDirection::Asc).with_order(1),
        ];
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r3", "r2", "r1"]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let schema = schema();
        let engine = SortEngine::new();
        let mut records = vec![
            task("r1", "same", Some(1.0)),
            task("r2", "same", Some(1.0)),
            task("r3", "same", Some(1.0)),
        ];
        let sorts = vec![
            SortRule::new("priority", SortDirection::Asc),
            SortRule::new("name", SortDirection::Asc).with_order(1),
        ];
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r1", "r2", "r3"]);
        // Sorting again must not shuffle the tied group.
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r1", "r2", "r3"]);
    }

    #[test]
    fn missing_values_sort_first_in_both_directions() {
        let schema = schema();
        let engine = SortEngine::new();
        let mut records = vec![
            task("r1", "a", Some(3.0)),
            task("r2", "b", None),
            task("r3", "c", Some(1.0)),
        ];
        let asc = vec![SortRule::new("priority", SortDirection::Asc)];
        engine.sort_records(&schema, &asc, &mut records);
        assert_eq!(ids(&records), ["r2", "r3", "r1"]);

        let desc = vec![SortRule::new("priority", SortDirection::Desc)];
        engine.sort_records(&schema, &desc, &mut records);
        assert_eq!(ids(&records), ["r2", "r1", "r3"]);
    }

    #[test]
    fn unknown_property_rules_are_skipped() {
        let schema = schema();
        let engine = SortEngine::new();
        let mut records = vec![task("r1", "b", None), task("r2", "a", None)];
        let sorts = vec![
            SortRule::new("ghost", SortDirection::Asc).with_order(0),
            SortRule::new("name", SortDirection::Asc).with_order(1),
        ];
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r2", "r1"]);
    }

    #[test]
    fn priority_is_the_order_field_not_array_position() {
        let schema = schema();
        let engine = SortEngine::new();
        let mut records = vec![
            task("r1", "apple", Some(1.0)),
            task("r2", "zebra", Some(9.0)),
        ];
        // Listed name-first, but priority carries the lower order.
        let sorts = vec![
            SortRule::new("name", SortDirection::Asc).with_order(5),
            SortRule::new("priority", SortDirection::Desc).with_order(0),
        ];
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r2", "r1"]);
    }

    #[test]
    fn select_values_sort_by_option_order() {
        let schema = schema();
        let engine = SortEngine::new();
        let select = |id: &str| PropertyValue::Select(id.into());
        let mut records = vec![
            Record::with_id("r1").with_value("status", select("done")),
            Record::with_id("r2").with_value("status", select("todo")),
            Record::with_id("r3").with_value("status", select("doing")),
        ];
        let sorts = vec![SortRule::new("status", SortDirection::Asc)];
        engine.sort_records(&schema, &sorts, &mut records);
        assert_eq!(ids(&records), ["r2", "r3", "r1"]);
    }

    #[test]
    fn borrowed_rows_sort_too() {
        let schema = schema();
        let engine = SortEngine::new();
        let owned = vec![task("r1", "b", None), task("r2", "a", None)];
        let mut rows: Vec<&Record> = owned.iter().collect();
        let sorts = vec![SortRule::new("name", SortDirection::Asc)];
        engine.sort_records(&schema, &sorts, &mut rows);
        assert_eq!(rows[0].id.as_str(), "r2");
    }
}
