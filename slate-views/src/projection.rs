//! The projection pipeline: columns, then rows, then order, then groups.

use tracing::debug;

use slate_schema::{Property, Record, Schema, ViewDefinition};

use crate::filter::FilterEngine;
use crate::group::{GroupEngine, RecordGroup};
use crate::sort::SortEngine;
use crate::visibility::VisibilityResolver;

/// A fully evaluated view over a record snapshot. Borrows from the schema
/// and the snapshot; compute it, render it, drop it.
#[derive(Debug)]
pub struct ViewProjection<'a> {
    pub view: &'a ViewDefinition,
    pub columns: Vec<&'a Property>,
    pub rows: Vec<&'a Record>,
    /// Present when the view groups by a property.
    pub groups: Option<Vec<RecordGroup<'a>>>,
}

/// Composes the engines in pipeline order. Pure and synchronous; every call
/// recomputes from the snapshot it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projection {
    filter: FilterEngine,
    sort: SortEngine,
    visibility: VisibilityResolver,
    group: GroupEngine,
}

impl Projection {
    pub fn new() -> Self {
        Self {
            filter: FilterEngine::new(),
            sort: SortEngine::new(),
            visibility: VisibilityResolver::new(),
            group: GroupEngine::new(),
        }
    }

    /// Evaluate a view over a snapshot.
    pub fn project<'a>(
        &self,
        schema: &'a Schema,
        view: &'a ViewDefinition,
        records: &'a [Record],
    ) -> ViewProjection<'a> {
        self.project_with_search(schema, view, records, None)
    }

    /// Evaluate a view with an optional local search term layered on top of
    /// the view's own filters.
    pub fn project_with_search<'a>(
        &self,
        schema: &'a Schema,
        view: &'a ViewDefinition,
        records: &'a [Record],
        search: Option<&str>,
    ) -> ViewProjection<'a> {
        let columns = self.visibility.visible_properties(schema, view);
        let mut rows: Vec<&Record> = records
            .iter()
            .filter(|record| self.filter.matches(schema, &view.filters, record))
            .filter(|record| {
                search.map_or(true, |query| self.filter.search_matches(schema, record, query))
            })
            .collect();
        self.sort.sort_records(schema, &view.sorts, &mut rows);
        let groups = view
            .group_by
            .as_ref()
            .map(|property| self.group.group_records(schema, property, &rows));
        debug!(
            view = %view.id,
            columns = columns.len(),
            rows = rows.len(),
            grouped = groups.is_some(),
            "view projected"
        );
        ViewProjection {
            view,
            columns,
            rows,
            groups,
        }
    }
}
