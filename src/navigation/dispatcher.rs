//! View dispatcher
//!
//! Four states: dashboard, loading, table and form. Every load carries the
//! generation it was issued under; answers for an older generation are
//! dropped when they arrive, so the last navigation wins rather than the
//! last response.

use super::menu::{MenuState, load_menu};
use super::table::TableSession;
use crate::api::{ActionTarget, TrytonApi};
use crate::error::{ConsoleError, Result};
use crate::fields::PendingLookup;
use crate::form::{FormSession, hydrate};
use crate::view::{ViewArchitecture, ViewType};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Limits applied while loading views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub list_limit: usize,
    pub relation_page_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            list_limit: 80,
            relation_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ViewState {
    #[default]
    Dashboard,
    Loading { target: ActionTarget },
    Table(TableSession),
    Form(FormSession),
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Dashboard => "dashboard",
            ViewState::Loading { .. } => "loading",
            ViewState::Table(_) => "table",
            ViewState::Form(_) => "form",
        }
    }
}

/// What a load produced
#[derive(Debug, Clone)]
pub enum LoadedView {
    Table(TableSession),
    Form(FormSession),
}

/// Handle for one outstanding load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub generation: u64,
    pub target: ActionTarget,
    /// Record to open when the target turns out to be a form
    pub record_id: Option<i64>,
}

/// Result of selecting a menu entry or a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum MenuOutcome {
    /// The entry has children; only its expanded flag changed
    Toggled { expanded: bool },
    Load(LoadTicket),
    /// Several targets matched; the caller must pick one with
    /// [`Navigator::choose`]
    Choose(Vec<ActionTarget>),
    /// The entry starts a wizard, which runs outside the view states
    Wizard { name: String, wizard: String },
    /// Nothing to open
    Dashboard,
    /// Leaving a dirty form was declined; nothing changed
    Stayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The switch was declined; nothing changed
    Stayed,
    Switched,
}

/// Confirmation that never lets a dirty form go
pub fn keep_edits(_form: &FormSession) -> bool {
    false
}

#[derive(Debug, Default)]
pub struct Navigator {
    pub menu: MenuState,
    state: ViewState,
    generation: u64,
    candidates: Vec<ActionTarget>,
    error: Option<ConsoleError>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Error from the last failed load, shown on the dashboard with a retry
    pub fn error(&self) -> Option<&ConsoleError> {
        self.error.as_ref()
    }

    pub fn form(&self) -> Option<&FormSession> {
        match &self.state {
            ViewState::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSession> {
        match &mut self.state {
            ViewState::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableSession> {
        match &self.state {
            ViewState::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Fetch the menu tree. A failure leaves the menu empty and is stored.
    pub async fn load_menu(&mut self, api: &dyn TrytonApi) -> Result<()> {
        match load_menu(api).await {
            Ok(roots) => {
                self.menu = MenuState::new(roots);
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Select a menu entry. Entries with children only toggle; leaves look
    /// up what they open. `confirm` is asked before a dirty form is left.
    pub async fn select_menu(
        &mut self,
        api: &dyn TrytonApi,
        menu_id: i64,
        confirm: impl FnOnce(&FormSession) -> bool,
    ) -> Result<MenuOutcome> {
        let Some(node) = self.menu.find(menu_id) else {
            return Err(ConsoleError::not_found(format!("menu entry #{}", menu_id)));
        };
        let (is_leaf, fallback_model) = (node.is_leaf(), node.res_model.clone());
        if !is_leaf {
            return Ok(MenuOutcome::Toggled {
                expanded: self.menu.toggle(menu_id),
            });
        }

        let mut targets = match api.action_targets(menu_id).await {
            Ok(targets) => targets,
            Err(e) if !e.is_auth_expired() && self.form().is_some_and(FormSession::is_dirty) => {
                warn!("Menu #{} lookup failed, keeping the unsaved form: {}", menu_id, e);
                self.error = Some(e.clone());
                return Err(e);
            }
            Err(e) => return Err(self.fail(e)),
        };
        if targets.is_empty() {
            if let Some(model) = fallback_model {
                targets.push(ActionTarget::window(model, ViewType::Tree));
            }
        }

        match targets.len() {
            0 => {
                if !self.leave_form(confirm) {
                    return Ok(MenuOutcome::Stayed);
                }
                self.go_dashboard();
                Ok(MenuOutcome::Dashboard)
            }
            1 => Ok(self.open_target(targets.remove(0), confirm)),
            _ => {
                debug!("Menu #{} has {} targets, asking the user", menu_id, targets.len());
                self.candidates = targets.clone();
                Ok(MenuOutcome::Choose(targets))
            }
        }
    }

    /// Pick one of the candidates offered by [`MenuOutcome::Choose`]. The
    /// choice is opened like any single target. When leaving a dirty form is
    /// declined the candidates stay on offer.
    pub fn choose(&mut self, index: usize, confirm: impl FnOnce(&FormSession) -> bool) -> Result<MenuOutcome> {
        let Some(target) = self.candidates.get(index).cloned() else {
            return Err(ConsoleError::not_found(format!("candidate {}", index + 1)));
        };
        let outcome = self.open_target(target, confirm);
        if outcome != MenuOutcome::Stayed {
            self.candidates.clear();
        }
        Ok(outcome)
    }

    pub fn candidates(&self) -> &[ActionTarget] {
        &self.candidates
    }

    fn open_target(&mut self, target: ActionTarget, confirm: impl FnOnce(&FormSession) -> bool) -> MenuOutcome {
        match target {
            ActionTarget::Wizard { name, wizard } => MenuOutcome::Wizard { name, wizard },
            window => match self.begin_load(window, None, confirm) {
                Some(ticket) => MenuOutcome::Load(ticket),
                None => MenuOutcome::Stayed,
            },
        }
    }

    /// Ask `confirm` before a dirty form is replaced. Returns false when the
    /// user declined; the form, its values and the generation are untouched.
    fn leave_form(&mut self, confirm: impl FnOnce(&FormSession) -> bool) -> bool {
        if let ViewState::Form(form) = &mut self.state {
            if form.is_dirty() {
                if !confirm(form) {
                    debug!("Leaving '{}' declined, keeping the form", form.model());
                    return false;
                }
                info!("Discarding unsaved changes to '{}'", form.model());
                form.discard();
            }
        }
        true
    }

    /// Enter the loading state and hand out a ticket for the new generation.
    /// `None` when the current form is dirty and `confirm` declined.
    pub fn begin_load(
        &mut self,
        target: ActionTarget,
        record_id: Option<i64>,
        confirm: impl FnOnce(&FormSession) -> bool,
    ) -> Option<LoadTicket> {
        if !self.leave_form(confirm) {
            return None;
        }
        self.generation += 1;
        self.error = None;
        self.state = ViewState::Loading {
            target: target.clone(),
        };
        Some(LoadTicket {
            generation: self.generation,
            target,
            record_id,
        })
    }

    /// Apply the answer to a load. Returns false when the ticket is stale
    /// and the answer was dropped.
    pub fn complete_load(&mut self, ticket: &LoadTicket, outcome: Result<LoadedView>) -> bool {
        if ticket.generation != self.generation {
            warn!(
                "Dropping stale load of '{}' (generation {}, current {})",
                ticket.target.name(),
                ticket.generation,
                self.generation
            );
            return false;
        }

        match outcome {
            Ok(LoadedView::Table(table)) => self.state = ViewState::Table(table),
            Ok(LoadedView::Form(form)) => self.state = ViewState::Form(form),
            Err(e) => {
                self.fail(e);
            }
        }
        true
    }

    /// Load the target of `ticket` and apply it
    pub async fn navigate(&mut self, api: &dyn TrytonApi, ticket: LoadTicket, options: LoadOptions) -> bool {
        let outcome = load_view(api, &ticket, options).await;
        self.complete_load(&ticket, outcome)
    }

    /// Open one record of `model` in a form
    pub fn open_record(
        &mut self,
        model: &str,
        id: i64,
        confirm: impl FnOnce(&FormSession) -> bool,
    ) -> Option<LoadTicket> {
        self.begin_load(ActionTarget::window(model, ViewType::Form), Some(id), confirm)
    }

    /// Leave a form for the list of its model. A dirty form asks `confirm`
    /// first; declining leaves everything as it was.
    pub fn switch_to_table(&mut self, confirm: impl FnOnce(&FormSession) -> bool) -> (SwitchOutcome, Option<LoadTicket>) {
        let Some(model) = self.form().map(|form| form.model().to_string()) else {
            return (SwitchOutcome::Stayed, None);
        };
        match self.begin_load(ActionTarget::window(model, ViewType::Tree), None, confirm) {
            Some(ticket) => (SwitchOutcome::Switched, Some(ticket)),
            None => (SwitchOutcome::Stayed, None),
        }
    }

    /// Back to the dashboard. Outstanding loads become stale.
    pub fn go_dashboard(&mut self) {
        self.generation += 1;
        self.candidates.clear();
        self.state = ViewState::Dashboard;
    }

    /// Forget everything tied to the session after the server rejected it
    pub fn reset_session(&mut self) {
        info!("Session rejected, clearing navigation state");
        self.go_dashboard();
        self.menu.clear();
        self.error = Some(ConsoleError::AuthExpired);
    }

    /// Record a failed load and fall back to the dashboard
    fn fail(&mut self, error: ConsoleError) -> ConsoleError {
        if error.is_auth_expired() {
            self.reset_session();
        } else {
            warn!("Load failed, returning to dashboard: {}", error);
            self.go_dashboard();
            self.error = Some(error.clone());
        }
        error
    }
}

/// Fetch what `ticket` points at. The architecture the server returns
/// decides between table and form, whatever type was requested.
pub async fn load_view(api: &dyn TrytonApi, ticket: &LoadTicket, options: LoadOptions) -> Result<LoadedView> {
    let ActionTarget::Window {
        model,
        view_id,
        view_type,
        domain,
        ..
    } = &ticket.target
    else {
        return Err(ConsoleError::Protocol(format!(
            "'{}' is not a window action",
            ticket.target.name()
        )));
    };

    let architecture = Arc::new(api.get_view_architecture(model, *view_id, *view_type).await?);
    match architecture.view_type {
        ViewType::Tree => {
            let mut table = TableSession::load(api, architecture, domain, options.list_limit).await?;
            resolve_table_references(api, &mut table).await;
            Ok(LoadedView::Table(table))
        }
        ViewType::Form => {
            let mut form = open_form(api, architecture, ticket.record_id).await?;
            if let Err(e) = hydrate::hydrate(api, &mut form, options.relation_page_size).await {
                warn!("Form for '{}' opened with incomplete data: {}", model, e);
            }
            Ok(LoadedView::Form(form))
        }
    }
}

async fn open_form(api: &dyn TrytonApi, architecture: Arc<ViewArchitecture>, record_id: Option<i64>) -> Result<FormSession> {
    match record_id {
        Some(id) => {
            let record = api
                .get_record(&architecture.model, id, &architecture.read_field_names())
                .await?;
            Ok(FormSession::open(Some(&record), architecture))
        }
        None => {
            let defaults = hydrate::load_defaults(api, &architecture).await?;
            Ok(FormSession::open_with_defaults(architecture, &defaults))
        }
    }
}

/// Best effort: cells whose names cannot be fetched keep showing the id
async fn resolve_table_references(api: &dyn TrytonApi, table: &mut TableSession) {
    let mut by_model: BTreeMap<String, Vec<(usize, PendingLookup)>> = BTreeMap::new();
    for (row, lookup) in table.take_pending_lookups() {
        by_model.entry(lookup.model.clone()).or_default().push((row, lookup));
    }

    for (model, cells) in by_model {
        let mut ids: Vec<i64> = cells.iter().map(|(_, l)| l.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let names = match api.read_display_names(&model, &ids).await {
            Ok(names) => names,
            Err(e) => {
                debug!("Display names for '{}' unavailable: {}", model, e);
                continue;
            }
        };
        for (row, lookup) in cells {
            if let Some(reference) = names.iter().find(|r| r.id == lookup.id) {
                table.resolve_reference(row, &lookup.field, reference.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{FieldDefinition, FieldKind};

    fn form() -> FormSession {
        let architecture = Arc::new(ViewArchitecture {
            model: "party.party".into(),
            view_id: None,
            view_type: ViewType::Form,
            fields: vec![FieldDefinition::new("name", FieldKind::Char)],
            layout_xml: String::new(),
        });
        FormSession::open(None, architecture)
    }

    fn start(navigator: &mut Navigator, model: &str, view_type: ViewType) -> LoadTicket {
        navigator
            .begin_load(ActionTarget::window(model, view_type), None, keep_edits)
            .unwrap()
    }

    #[test]
    fn test_stale_completion_is_dropped() {
        let mut navigator = Navigator::new();
        let first = start(&mut navigator, "party.party", ViewType::Form);
        let second = start(&mut navigator, "sale.sale", ViewType::Form);

        assert!(!navigator.complete_load(&first, Ok(LoadedView::Form(form()))));
        assert_eq!(navigator.state().name(), "loading");

        assert!(navigator.complete_load(&second, Ok(LoadedView::Form(form()))));
        assert_eq!(navigator.state().name(), "form");
    }

    #[test]
    fn test_failed_load_returns_to_dashboard() {
        let mut navigator = Navigator::new();
        let ticket = start(&mut navigator, "party.party", ViewType::Tree);
        navigator.complete_load(&ticket, Err(ConsoleError::not_found("view")));

        assert_eq!(navigator.state().name(), "dashboard");
        assert!(navigator.error().is_some_and(ConsoleError::is_retryable));
    }

    #[test]
    fn test_auth_failure_resets_session() {
        let mut navigator = Navigator::new();
        let ticket = start(&mut navigator, "party.party", ViewType::Tree);
        navigator.complete_load(&ticket, Err(ConsoleError::AuthExpired));

        assert_eq!(navigator.error(), Some(&ConsoleError::AuthExpired));
        assert!(navigator.menu.roots.is_empty());
    }

    #[test]
    fn test_dashboard_invalidates_outstanding_load() {
        let mut navigator = Navigator::new();
        let ticket = start(&mut navigator, "party.party", ViewType::Tree);
        navigator.go_dashboard();
        assert!(!navigator.complete_load(&ticket, Ok(LoadedView::Form(form()))));
        assert_eq!(navigator.state().name(), "dashboard");
    }

    #[test]
    fn test_clean_form_switches_without_asking() {
        let mut navigator = Navigator::new();
        let ticket = navigator.open_record("party.party", 1, keep_edits).unwrap();
        navigator.complete_load(&ticket, Ok(LoadedView::Form(form())));

        let (outcome, ticket) = navigator.switch_to_table(|_| panic!("should not ask"));
        assert_eq!(outcome, SwitchOutcome::Switched);
        assert_eq!(ticket.map(|t| t.target), Some(ActionTarget::window("party.party", ViewType::Tree)));
    }

    #[test]
    fn test_declined_leave_keeps_dirty_form() {
        let mut navigator = Navigator::new();
        let ticket = navigator.open_record("party.party", 1, keep_edits).unwrap();
        navigator.complete_load(&ticket, Ok(LoadedView::Form(form())));
        navigator.form_mut().unwrap().set_input("name", "Acme").unwrap();
        let generation = navigator.generation();

        assert!(navigator.open_record("party.party", 2, keep_edits).is_none());
        assert!(navigator
            .begin_load(ActionTarget::window("sale.sale", ViewType::Tree), None, keep_edits)
            .is_none());
        assert_eq!(navigator.state().name(), "form");
        assert_eq!(navigator.generation(), generation);
        assert!(navigator.form().unwrap().is_dirty());

        let ticket = navigator.open_record("party.party", 2, |_| true).unwrap();
        assert_eq!(ticket.generation, generation + 1);
        assert_eq!(navigator.state().name(), "loading");
    }
}
