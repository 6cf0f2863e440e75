//! Form session model
//!
//! Holds the current and baseline values of one open record, the option and
//! display-name caches filled in by hydration, and any error the server
//! reported against the form. The baseline is taken right after the record
//! or defaults are coerced in and is only touched again when a pending
//! many2one name arrives for a value nobody has edited.

use crate::error::{ConsoleError, Result};
use crate::fields::{FieldValue, PendingLookup, RecordValue, RelationRef, RenderHint, resolve};
use crate::view::{
    FieldDefinition, FieldKind, Layout, SelectionOption, SelectionSource, ViewArchitecture, parse_layout,
};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Errors the server reported against this form. Current values are never
/// cleared because of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    pub form: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.form.is_none() && self.fields.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FormSession {
    architecture: Arc<ViewArchitecture>,
    layout: Layout,
    record_id: Option<i64>,
    initial: RecordValue,
    current: RecordValue,
    dirty: bool,
    selection_cache: HashMap<String, Vec<SelectionOption>>,
    relation_cache: HashMap<String, Vec<RelationRef>>,
    pending: Vec<PendingLookup>,
    errors: FormErrors,
}

fn same_value(a: &FieldValue, b: &FieldValue) -> bool {
    match (a.relation_id(), b.relation_id()) {
        (Some(left), Some(right)) => left == right,
        _ => a == b,
    }
}

fn is_blank(value: Option<&FieldValue>) -> bool {
    match value {
        None | Some(FieldValue::Null) => true,
        Some(FieldValue::Text(s)) => s.trim().is_empty(),
        Some(FieldValue::Ids(ids)) => ids.is_empty(),
        _ => false,
    }
}

impl FormSession {
    /// Open a session for an existing record, or a new record when
    /// `record` is `None`
    pub fn open(record: Option<&Map<String, Value>>, architecture: Arc<ViewArchitecture>) -> Self {
        match record {
            Some(record) => Self::from_wire(record, architecture),
            None => Self::open_with_defaults(architecture, &Map::new()),
        }
    }

    /// Open a new-record session. Field definition defaults win; `defaults`
    /// (from `default_get` or a wizard state) fill the rest.
    pub fn open_with_defaults(architecture: Arc<ViewArchitecture>, defaults: &Map<String, Value>) -> Self {
        let mut seed = Map::new();
        for field in &architecture.fields {
            if let Some(default) = &field.default {
                seed.insert(field.name.clone(), default.clone());
            }
        }
        for (key, value) in defaults {
            if !seed.contains_key(key) {
                seed.insert(key.clone(), value.clone());
            }
        }

        let mut session = Self::from_wire(&seed, architecture);
        session.record_id = None;
        session
    }

    fn from_wire(record: &Map<String, Value>, architecture: Arc<ViewArchitecture>) -> Self {
        let mut values = RecordValue::new();
        let mut pending = Vec::new();

        for field in &architecture.fields {
            let Some(coerced) = resolve(&field.kind).coerce_in(field, record) else {
                continue;
            };
            if let Some(lookup) = coerced.lookup {
                pending.push(lookup);
            }
            values.insert(field.name.clone(), coerced.value);
        }

        let layout = parse_layout(&architecture.layout_xml, &architecture.fields);
        debug!(
            "Opened form for '{}' with {} values, {} pending lookups",
            architecture.model,
            values.len(),
            pending.len()
        );

        Self {
            layout,
            record_id: record.get("id").and_then(|id| id.as_i64()),
            initial: values.clone(),
            current: values,
            dirty: false,
            selection_cache: HashMap::new(),
            relation_cache: HashMap::new(),
            pending,
            errors: FormErrors::default(),
            architecture,
        }
    }

    pub fn architecture(&self) -> &ViewArchitecture {
        &self.architecture
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn model(&self) -> &str {
        &self.architecture.model
    }

    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub fn is_new(&self) -> bool {
        self.record_id.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.current.get(field)
    }

    pub fn current_values(&self) -> &RecordValue {
        &self.current
    }

    pub fn initial_values(&self) -> &RecordValue {
        &self.initial
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn render_hint(&self, field: &str) -> Option<RenderHint> {
        let def = self.architecture.field(field)?;
        Some(resolve(&def.kind).render_hint(def))
    }

    fn definition(&self, field: &str) -> Result<&FieldDefinition> {
        self.architecture
            .field(field)
            .ok_or_else(|| ConsoleError::not_found(format!("field '{}' on '{}'", field, self.architecture.model)))
    }

    /// Replace one value and recompute the dirty flag
    pub fn set_value(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let def = self.definition(field)?;
        if def.readonly {
            return Err(ConsoleError::field_validation(field, "field is read-only"));
        }
        if !resolve(&def.kind).submittable() {
            return Err(ConsoleError::field_validation(
                field,
                format!("{} fields cannot be edited here", def.kind.tag()),
            ));
        }

        self.current.insert(field.to_string(), value);
        self.errors.fields.remove(field);
        self.recompute_dirty();
        Ok(())
    }

    /// Parse user text for `field` and store it. A many2one id typed by the
    /// user is queued for a display-name lookup.
    pub fn set_input(&mut self, field: &str, text: &str) -> Result<()> {
        let def = self.definition(field)?;
        let value = resolve(&def.kind).parse_input(def, text)?;

        if let FieldKind::Selection { source: SelectionSource::Method(_) } = &def.kind {
            if !value.is_null() {
                let options = self.selection_cache.get(field).ok_or_else(|| {
                    ConsoleError::field_validation(field, "options have not been loaded yet")
                })?;
                let typed = text.trim();
                let option = options
                    .iter()
                    .find(|o| o.value.as_str() == Some(typed) || o.label == typed)
                    .ok_or_else(|| {
                        ConsoleError::field_validation(field, format!("'{}' is not a valid option", typed))
                    })?;
                let value = FieldValue::from_scalar(&option.value);
                return self.set_value(field, value);
            }
        }

        let lookup = match (&value, def.kind.relation()) {
            (FieldValue::Pending(id), Some(model)) => Some(PendingLookup {
                field: field.to_string(),
                model: model.to_string(),
                id: *id,
            }),
            _ => None,
        };
        self.set_value(field, value)?;
        if let Some(lookup) = lookup {
            self.pending.push(lookup);
        }
        Ok(())
    }

    fn recompute_dirty(&mut self) {
        self.dirty = self
            .architecture
            .fields
            .iter()
            .any(|f| self.field_changed(&f.name));
    }

    fn field_changed(&self, field: &str) -> bool {
        match (self.current.get(field), self.initial.get(field)) {
            (Some(current), Some(initial)) => !same_value(current, initial),
            (Some(value), None) | (None, Some(value)) => !value.is_null(),
            (None, None) => false,
        }
    }

    /// Throw away edits and errors
    pub fn discard(&mut self) {
        self.current = self.initial.clone();
        self.dirty = false;
        self.errors = FormErrors::default();
    }

    /// Whether `field` is ever sent to the server in its current state
    pub fn is_submittable(&self, field: &str) -> bool {
        let Some(def) = self.architecture.field(field) else {
            return false;
        };
        if field.contains('.') || def.readonly || !resolve(&def.kind).submittable() {
            return false;
        }
        match &def.kind {
            FieldKind::Selection { source: SelectionSource::Method(_) } => {
                self.selection_cache.contains_key(field)
            }
            _ => true,
        }
    }

    fn payload_where(&self, include: impl Fn(&str) -> bool) -> Map<String, Value> {
        let mut payload = Map::new();
        for def in &self.architecture.fields {
            if !include(&def.name) || !self.is_submittable(&def.name) {
                continue;
            }
            if let Some(value) = self.current.get(&def.name) {
                payload.insert(def.name.clone(), resolve(&def.kind).coerce_out(def, value));
            }
        }
        payload
    }

    /// Every submittable value in wire format, for creates
    pub fn to_wire_payload(&self) -> Map<String, Value> {
        self.payload_where(|_| true)
    }

    /// Only values that differ from the baseline, for updates
    pub fn changed_payload(&self) -> Map<String, Value> {
        self.payload_where(|field| self.field_changed(field))
    }

    /// Required fields that would be sent empty
    pub fn missing_required(&self) -> Vec<&str> {
        self.architecture
            .fields
            .iter()
            .filter(|f| f.required && !f.readonly && resolve(&f.kind).submittable())
            .filter(|f| is_blank(self.current.get(&f.name)))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Refuse to save locally when required values are missing. The error is
    /// also recorded against the first offending field.
    pub fn check_required(&mut self) -> Result<()> {
        let missing: Vec<String> = self.missing_required().into_iter().map(str::to_string).collect();
        let Some(first) = missing.first() else {
            return Ok(());
        };
        let label = self
            .architecture
            .field(first)
            .map(|f| f.label.clone())
            .unwrap_or_else(|| first.clone());
        let error = ConsoleError::field_validation(first.clone(), format!("A value is required for \"{}\"", label));
        for field in &missing {
            self.errors.fields.insert(field.clone(), "required".to_string());
        }
        Err(error)
    }

    /// Record a server rejection next to the field or as a form banner.
    /// Returns false for errors that do not belong to the form.
    pub fn apply_server_error(&mut self, error: &ConsoleError) -> bool {
        let ConsoleError::Validation { field, message } = error else {
            return false;
        };
        match field {
            Some(field) if self.architecture.field(field).is_some() => {
                self.errors.fields.insert(field.clone(), message.clone());
            }
            _ => self.errors.form = Some(message.clone()),
        }
        true
    }

    /// Options currently available for a selection field. Empty until a
    /// method-sourced list has been resolved.
    pub fn selection_options(&self, field: &str) -> &[SelectionOption] {
        match self.architecture.field(field).map(|f| &f.kind) {
            Some(FieldKind::Selection { source: SelectionSource::Static(options) }) => options,
            Some(FieldKind::Selection { source: SelectionSource::Method(_) }) => {
                self.selection_cache.get(field).map(Vec::as_slice).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    /// Selection fields whose options still have to be fetched, with the
    /// method to call
    pub fn unresolved_selections(&self) -> Vec<(String, String)> {
        self.architecture
            .fields
            .iter()
            .filter_map(|f| match &f.kind {
                FieldKind::Selection { source: SelectionSource::Method(method) }
                    if !self.selection_cache.contains_key(&f.name) =>
                {
                    Some((f.name.clone(), method.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Store resolved options. Each field's options are written once.
    pub fn set_selection_options(&mut self, field: &str, options: Vec<SelectionOption>) -> bool {
        if self.selection_cache.contains_key(field) {
            debug!("Selection options for '{}' already cached", field);
            return false;
        }
        self.selection_cache.insert(field.to_string(), options);
        true
    }

    /// Drain the many2one lookups queued so far
    pub fn take_pending_lookups(&mut self) -> Vec<PendingLookup> {
        std::mem::take(&mut self.pending)
    }

    /// Put lookups back after a failed fetch so a retry can pick them up
    pub fn requeue_lookups(&mut self, lookups: Vec<PendingLookup>) {
        self.pending.extend(lookups);
    }

    /// Fill in the display name of a pending many2one. Values the user has
    /// changed since are left alone.
    pub fn resolve_reference(&mut self, field: &str, reference: RelationRef) -> bool {
        let mut applied = false;
        for values in [&mut self.current, &mut self.initial] {
            if let Some(slot) = values.get_mut(field) {
                if *slot == FieldValue::Pending(reference.id) {
                    *slot = FieldValue::Reference(reference.clone());
                    applied = true;
                }
            }
        }
        if !applied {
            warn!("Dropping stale display name for '{}' #{}", field, reference.id);
        }
        self.recompute_dirty();
        applied
    }

    /// Many2many fields with ids whose names are not cached yet
    pub fn unloaded_relations(&self) -> Vec<(String, String, Vec<i64>)> {
        self.architecture
            .fields
            .iter()
            .filter_map(|f| {
                let FieldKind::Many2Many { relation } = &f.kind else {
                    return None;
                };
                let FieldValue::Ids(ids) = self.current.get(&f.name)? else {
                    return None;
                };
                let cached = self.relation_cache.get(&f.name);
                let missing: Vec<i64> = ids
                    .iter()
                    .copied()
                    .filter(|id| !cached.is_some_and(|refs| refs.iter().any(|r| r.id == *id)))
                    .collect();
                (!missing.is_empty()).then(|| (f.name.clone(), relation.clone(), missing))
            })
            .collect()
    }

    /// Cache display names for many2many members. Does not affect dirtiness.
    pub fn cache_relation_names(&mut self, field: &str, refs: Vec<RelationRef>) {
        let cache = self.relation_cache.entry(field.to_string()).or_default();
        for reference in refs {
            if !cache.iter().any(|r| r.id == reference.id) {
                cache.push(reference);
            }
        }
    }

    pub fn relation_names(&self, field: &str) -> Vec<RelationRef> {
        let Some(FieldValue::Ids(ids)) = self.current.get(field) else {
            return Vec::new();
        };
        let cache = self.relation_cache.get(field);
        ids.iter()
            .map(|id| {
                cache
                    .and_then(|refs| refs.iter().find(|r| r.id == *id))
                    .cloned()
                    .unwrap_or_else(|| RelationRef::new(*id, format!("#{}", id)))
            })
            .collect()
    }

    /// Text shown for a field, using selection labels and cached names
    pub fn display_value(&self, field: &str) -> String {
        let Some(value) = self.current.get(field) else {
            return String::new();
        };
        match value {
            FieldValue::Ids(_) => self
                .relation_names(field)
                .into_iter()
                .map(|r| r.display_name)
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Null => String::new(),
            other => {
                let scalar = other.to_scalar();
                self.selection_options(field)
                    .iter()
                    .find(|o| o.value == scalar)
                    .map(|o| o.label.clone())
                    .unwrap_or_else(|| other.to_string())
            }
        }
    }
}
