//! List (tree view) model

use crate::api::TrytonApi;
use crate::error::Result;
use crate::fields::{FieldValue, PendingLookup, RecordValue, RelationRef, resolve};
use crate::view::{FieldKind, SelectionSource, ViewArchitecture, parse_layout};
use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Rows of one model rendered through a tree view
#[derive(Debug, Clone)]
pub struct TableSession {
    architecture: Arc<ViewArchitecture>,
    columns: Vec<String>,
    ids: Vec<i64>,
    rows: Vec<RecordValue>,
    pending: Vec<(usize, PendingLookup)>,
}

impl TableSession {
    /// Normalise wire rows through the field registry
    pub fn new(architecture: Arc<ViewArchitecture>, wire_rows: &[Map<String, Value>]) -> Self {
        let layout = parse_layout(&architecture.layout_xml, &architecture.fields);
        let columns: Vec<String> = layout
            .columns(&architecture.fields)
            .into_iter()
            .filter(|name| !name.contains('.') && architecture.field(name).is_some())
            .map(str::to_string)
            .collect();

        let mut ids = Vec::with_capacity(wire_rows.len());
        let mut rows = Vec::with_capacity(wire_rows.len());
        let mut pending = Vec::new();
        for (index, wire) in wire_rows.iter().enumerate() {
            ids.push(wire.get("id").and_then(|id| id.as_i64()).unwrap_or_default());
            let mut row = RecordValue::new();
            for column in &columns {
                let Some(def) = architecture.field(column) else {
                    continue;
                };
                if let Some(coerced) = resolve(&def.kind).coerce_in(def, wire) {
                    if let Some(lookup) = coerced.lookup {
                        pending.push((index, lookup));
                    }
                    row.insert(column.clone(), coerced.value);
                }
            }
            rows.push(row);
        }

        debug!(
            "Table for '{}': {} rows, {} columns",
            architecture.model,
            rows.len(),
            columns.len()
        );
        Self {
            architecture,
            columns,
            ids,
            rows,
            pending,
        }
    }

    /// Search and read rows for `architecture` (a tree view)
    pub async fn load(
        api: &dyn TrytonApi,
        architecture: Arc<ViewArchitecture>,
        domain: &Value,
        limit: usize,
    ) -> Result<Self> {
        let columns = parse_layout(&architecture.layout_xml, &architecture.fields)
            .columns(&architecture.fields)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let fields: Vec<String> = architecture
            .read_field_names()
            .into_iter()
            .filter(|name| columns.iter().any(|c| name == c || name.starts_with(&format!("{}.", c))))
            .collect();

        let wire_rows = api
            .list_records(&architecture.model, domain, &fields, limit)
            .await?;
        Ok(Self::new(architecture, &wire_rows))
    }

    pub fn architecture(&self) -> &ViewArchitecture {
        &self.architecture
    }

    pub fn model(&self) -> &str {
        &self.architecture.model
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn record_id(&self, row: usize) -> Option<i64> {
        self.ids.get(row).copied()
    }

    pub fn row(&self, row: usize) -> Option<&RecordValue> {
        self.rows.get(row)
    }

    /// Column header text
    pub fn header(&self, column: &str) -> String {
        self.architecture
            .field(column)
            .map(|f| f.label.clone())
            .unwrap_or_else(|| column.to_string())
    }

    /// Cell text. Many2one cells show the display name, selection cells
    /// their label.
    pub fn cell(&self, row: usize, column: &str) -> String {
        let Some(value) = self.rows.get(row).and_then(|r| r.get(column)) else {
            return String::new();
        };
        if let Some(FieldKind::Selection { source: SelectionSource::Static(options) }) =
            self.architecture.field(column).map(|f| &f.kind)
        {
            let scalar = value.to_scalar();
            if let Some(option) = options.iter().find(|o| o.value == scalar) {
                return option.label.clone();
            }
        }
        value.to_string()
    }

    /// Many2one cells that arrived without a display name
    pub fn take_pending_lookups(&mut self) -> Vec<(usize, PendingLookup)> {
        std::mem::take(&mut self.pending)
    }

    pub fn resolve_reference(&mut self, row: usize, field: &str, reference: RelationRef) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(field)) {
            if *slot == FieldValue::Pending(reference.id) {
                *slot = FieldValue::Reference(reference);
            }
        }
    }
}
