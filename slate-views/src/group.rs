//! Group-by bucketing for board and grouped-list layouts.

use indexmap::IndexMap;
use tracing::trace;

use slate_schema::{
    OptionId, PropertyId, PropertyType, PropertyTypeRegistry, Record, Schema,
};

/// One bucket of a grouped projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordGroup<'a> {
    /// The option the bucket represents when grouping by a select property.
    pub key: Option<OptionId>,
    pub label: String,
    pub records: Vec<&'a Record>,
}

/// Buckets records by one property's value.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupEngine {
    registry: PropertyTypeRegistry,
}

impl GroupEngine {
    pub fn new() -> Self {
        Self {
            registry: PropertyTypeRegistry::new(),
        }
    }

    /// Bucket `records` by their value under `group_by`.
    ///
    /// SELECT grouping yields one bucket per option in option order, even
    /// empty ones (a board renders every column), then a trailing unnamed
    /// bucket for records without a recognized option. Other types bucket
    /// by display string in first-seen order. An unknown `group_by` yields
    /// a single bucket holding everything.
    pub fn group_records<'a>(
        &self,
        schema: &Schema,
        group_by: &PropertyId,
        records: &[&'a Record],
    ) -> Vec<RecordGroup<'a>> {
        let Some(property) = schema.property(group_by) else {
            trace!(property = %group_by, "group-by references unknown property, single bucket");
            return vec![RecordGroup {
                key: None,
                label: String::new(),
                records: records.to_vec(),
            }];
        };

        if property.type_ == PropertyType::Select {
            let options = property.options().unwrap_or(&[]);
            let mut buckets: Vec<RecordGroup<'a>> = options
                .iter()
                .map(|option| RecordGroup {
                    key: Some(option.id.clone()),
                    label: option.name.clone(),
                    records: Vec::new(),
                })
                .collect();
            let mut rest = RecordGroup {
                key: None,
                label: String::new(),
                records: Vec::new(),
            };
            for record in records {
                let slot = record
                    .value(group_by)
                    .and_then(|v| v.as_select())
                    .and_then(|id| buckets.iter_mut().find(|b| b.key.as_ref() == Some(id)));
                match slot {
                    Some(bucket) => bucket.records.push(record),
                    None => rest.records.push(record),
                }
            }
            if !rest.records.is_empty() {
                buckets.push(rest);
            }
            return buckets;
        }

        let mut buckets: IndexMap<String, Vec<&'a Record>> = IndexMap::new();
        for record in records {
            let label = self.registry.display_value(
                property.type_,
                record.value(group_by),
                property.options(),
            );
            buckets.entry(label).or_default().push(record);
        }
        buckets
            .into_iter()
            .map(|(label, records)| RecordGroup {
                key: None,
                label,
                records,
            })
            .collect()
    }
}
