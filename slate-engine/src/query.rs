//! List-endpoint query building.
//!
//! The wire grammar is bracketed per-field:
//! `filters[<property>][<operator>]=<value>` and
//! `sorts[<i>][field]` / `sorts[<i>][direction]`, plus `viewId`, `page`,
//! `limit`, and `search`. Capabilities gate emission: a parameter the store
//! does not understand is simply never sent, and the corresponding
//! narrowing happens locally instead.

use serde_json::Value as JsonValue;
use tracing::trace;

use slate_schema::{FilterRule, SortRule, ViewId};

use crate::config::Capabilities;

/// Parameters for fetching a page of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub view_id: Option<ViewId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub filters: Vec<FilterRule>,
    pub sorts: Vec<SortRule>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, view: impl Into<ViewId>) -> Self {
        self.view_id = Some(view.into());
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterRule>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sorts(mut self, sorts: Vec<SortRule>) -> Self {
        self.sorts = sorts;
        self
    }

    /// Encode as query pairs, omitting whatever the store cannot handle.
    pub fn encode(&self, capabilities: &Capabilities) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(view) = &self.view_id {
            pairs.push(("viewId".to_string(), view.to_string()));
        }
        if capabilities.pagination {
            if let Some(page) = self.page {
                pairs.push(("page".to_string(), page.to_string()));
            }
            if let Some(limit) = self.limit {
                pairs.push(("limit".to_string(), limit.to_string()));
            }
        }
        if capabilities.search {
            if let Some(search) = &self.search {
                if !search.trim().is_empty() {
                    pairs.push(("search".to_string(), search.clone()));
                }
            }
        }
        if capabilities.filters {
            let mut rules: Vec<&FilterRule> = self.filters.iter().collect();
            rules.sort_by_key(|r| r.order);
            for rule in rules {
                pairs.push((
                    format!("filters[{}][{}]", rule.property, rule.operator),
                    encode_rule_value(&rule.value),
                ));
            }
        }
        if capabilities.sorts {
            let mut rules: Vec<&SortRule> = self.sorts.iter().collect();
            rules.sort_by_key(|r| r.order);
            for (i, rule) in rules.iter().enumerate() {
                pairs.push((format!("sorts[{i}][field]"), rule.property.to_string()));
                pairs.push((format!("sorts[{i}][direction]"), rule.direction.to_string()));
            }
        }
        trace!(pairs = pairs.len(), "encoded list query");
        pairs
    }

    /// Whether this query narrows anything beyond pagination.
    pub fn narrows(&self) -> bool {
        self.search.is_some() || !self.filters.is_empty() || !self.sorts.is_empty()
    }
}

/// Scalar rendering of a rule value. Valueless operators encode as `true`;
/// lists join with commas.
fn encode_rule_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "true".to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Array(items) => items
            .iter()
            .map(encode_rule_value)
            .collect::<Vec<_>>()
            .join(","),
        JsonValue::Object(_) => value.to_string(),
    }
}
