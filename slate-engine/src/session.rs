//! Per-cell edit sessions.
//!
//! Text-like cells edit through a deferred session: [`RecordEditSession::begin`]
//! captures the current value and opens a draft, `input` revises it, and
//! `submit` (blur or Enter) coerces and commits. Escape is `cancel`, or just
//! dropping the session. Picker-driven types (checkbox, select, date,
//! multi-select) never dwell in an editing state; their helpers capture,
//! coerce, and commit in one call, issuing at most one store mutation.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::debug;

use slate_schema::{
    OptionId, PropertyAction, PropertyId, PropertyType, PropertyValue, RecordId, SchemaError,
};

use crate::context::ModuleContext;
use crate::error::Result;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No edit in progress. Sessions begin past this state; it is the
    /// terminal state a consumed session conceptually returns to.
    Viewing,
    Editing {
        draft: String,
    },
    Committing,
}

/// What ended a deferred edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    Blur,
    Enter,
}

impl CommitTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Enter => "enter",
        }
    }
}

/// Whether a commit reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The candidate equalled the captured value; no write was issued.
    Unchanged,
}

/// A deferred edit of one cell.
#[derive(Debug)]
pub struct RecordEditSession {
    record: RecordId,
    property: PropertyId,
    captured: Option<PropertyValue>,
    state: SessionState,
}

impl RecordEditSession {
    /// Start editing a text-like cell.
    ///
    /// Fails with `NotFound` for unknown records or properties,
    /// `UnsupportedOperation` for computed, system, and picker-driven
    /// types, and `Permission` when protection forbids editing. The draft
    /// starts as the current display string.
    pub fn begin(
        context: &ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
    ) -> Result<Self> {
        let record = context
            .record(record_id)
            .ok_or_else(|| SchemaError::not_found("record", record_id))?;
        let property = context
            .schema()
            .property(property_id)
            .ok_or_else(|| SchemaError::not_found("property", property_id))?;
        if property.type_.is_computed() || property.type_.is_system() {
            return Err(SchemaError::unsupported(format!(
                "{} values cannot be edited",
                property.type_
            ))
            .into());
        }
        if property.type_.commits_immediately() {
            return Err(SchemaError::unsupported(format!(
                "{} cells commit on selection; use the picker helpers",
                property.type_
            ))
            .into());
        }
        context.guard().authorize(PropertyAction::Edit, property)?;

        let captured = record.value(property_id).cloned();
        let draft = context.registry().display_value(
            property.type_,
            captured.as_ref(),
            property.options(),
        );
        debug!(record = %record_id, property = %property_id, "edit session opened");
        Ok(Self {
            record: record_id.clone(),
            property: property_id.clone(),
            captured,
            state: SessionState::Editing { draft },
        })
    }

    pub fn record(&self) -> &RecordId {
        &self.record
    }

    pub fn property(&self) -> &PropertyId {
        &self.property
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn captured(&self) -> Option<&PropertyValue> {
        self.captured.as_ref()
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            SessionState::Editing { draft } => Some(draft),
            _ => None,
        }
    }

    /// Replace the draft text.
    pub fn input(&mut self, text: impl Into<String>) {
        if let SessionState::Editing { draft } = &mut self.state {
            *draft = text.into();
        }
    }

    /// Coerce the draft and commit it.
    ///
    /// A blank draft clears the value. A draft that coerces back to the
    /// captured value skips the write. Coercion failures abort before any
    /// state changes; dispatch failures roll the optimistic apply back and
    /// surface once. The session is consumed either way.
    pub async fn submit(
        mut self,
        context: &mut ModuleContext,
        trigger: CommitTrigger,
    ) -> Result<CommitOutcome> {
        let draft = match std::mem::replace(&mut self.state, SessionState::Committing) {
            SessionState::Editing { draft } => draft,
            other => {
                self.state = other;
                return Ok(CommitOutcome::Unchanged);
            }
        };
        let property = context
            .schema()
            .property(&self.property)
            .ok_or_else(|| SchemaError::not_found("property", &self.property))?;
        let candidate = context
            .registry()
            .coerce(property.type_, &JsonValue::String(draft))?;
        if candidate == self.captured {
            debug!(record = %self.record, property = %self.property, "draft unchanged, write skipped");
            return Ok(CommitOutcome::Unchanged);
        }
        debug!(
            record = %self.record,
            property = %self.property,
            trigger = trigger.as_str(),
            "committing edit"
        );
        context
            .commit_value(&self.record, &self.property, candidate, self.captured.clone())
            .await?;
        Ok(CommitOutcome::Committed)
    }

    /// Discard the draft (Escape). Nothing was written, so nothing rolls
    /// back.
    pub fn cancel(self) {
        debug!(record = %self.record, property = %self.property, "edit session cancelled");
    }

    // Picker-driven commits. Each issues at most one store mutation.

    /// Flip a checkbox. A missing value counts as unchecked, so the first
    /// toggle writes `true`.
    pub async fn toggle_checkbox(
        context: &mut ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
    ) -> Result<CommitOutcome> {
        let captured = Self::capture(context, record_id, property_id, PropertyType::Checkbox)?;
        let current = captured
            .as_ref()
            .and_then(PropertyValue::as_checkbox)
            .unwrap_or(false);
        let candidate = Some(PropertyValue::Checkbox(!current));
        context
            .commit_value(record_id, property_id, candidate, captured)
            .await?;
        Ok(CommitOutcome::Committed)
    }

    /// Pick a select option, or `None` to clear. Picking the current
    /// option is a no-op.
    pub async fn pick_option(
        context: &mut ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
        option: Option<&OptionId>,
    ) -> Result<CommitOutcome> {
        let captured = Self::capture(context, record_id, property_id, PropertyType::Select)?;
        if let Some(id) = option {
            Self::require_option(context, property_id, id)?;
        }
        let candidate = option.map(|id| PropertyValue::Select(id.clone()));
        if candidate == captured {
            return Ok(CommitOutcome::Unchanged);
        }
        context
            .commit_value(record_id, property_id, candidate, captured)
            .await?;
        Ok(CommitOutcome::Committed)
    }

    /// Pick a date, or `None` to clear.
    pub async fn pick_date(
        context: &mut ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
        date: Option<DateTime<Utc>>,
    ) -> Result<CommitOutcome> {
        let captured = Self::capture(context, record_id, property_id, PropertyType::Date)?;
        let candidate = date.map(PropertyValue::Date);
        if candidate == captured {
            return Ok(CommitOutcome::Unchanged);
        }
        context
            .commit_value(record_id, property_id, candidate, captured)
            .await?;
        Ok(CommitOutcome::Committed)
    }

    /// Toggle one option in a multi-select. Removing the last option
    /// clears the value.
    pub async fn toggle_option(
        context: &mut ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
        option: &OptionId,
    ) -> Result<CommitOutcome> {
        let captured = Self::capture(context, record_id, property_id, PropertyType::MultiSelect)?;
        Self::require_option(context, property_id, option)?;
        let mut selected = captured
            .as_ref()
            .and_then(PropertyValue::as_multi_select)
            .map(<[OptionId]>::to_vec)
            .unwrap_or_default();
        if selected.iter().any(|id| id == option) {
            selected.retain(|id| id != option);
        } else {
            selected.push(option.clone());
        }
        let candidate = if selected.is_empty() {
            None
        } else {
            Some(PropertyValue::MultiSelect(selected))
        };
        if candidate == captured {
            return Ok(CommitOutcome::Unchanged);
        }
        context
            .commit_value(record_id, property_id, candidate, captured)
            .await?;
        Ok(CommitOutcome::Committed)
    }

    /// Shared picker preamble: resolve, type-check, authorize, capture.
    fn capture(
        context: &ModuleContext,
        record_id: &RecordId,
        property_id: &PropertyId,
        expected: PropertyType,
    ) -> Result<Option<PropertyValue>> {
        let record = context
            .record(record_id)
            .ok_or_else(|| SchemaError::not_found("record", record_id))?;
        let property = context
            .schema()
            .property(property_id)
            .ok_or_else(|| SchemaError::not_found("property", property_id))?;
        if property.type_ != expected {
            return Err(SchemaError::unsupported(format!(
                "'{}' is {}, not {expected}",
                property.name, property.type_
            ))
            .into());
        }
        context.guard().authorize(PropertyAction::Edit, property)?;
        Ok(record.value(property_id).cloned())
    }

    fn require_option(
        context: &ModuleContext,
        property_id: &PropertyId,
        option: &OptionId,
    ) -> Result<()> {
        let known = context
            .schema()
            .property(property_id)
            .map_or(false, |p| p.option(option).is_some());
        if known {
            Ok(())
        } else {
            Err(SchemaError::not_found("option", option).into())
        }
    }
}
