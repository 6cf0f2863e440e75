use super::browse::pick_relation;
use super::{connect, load_options, parse_assignments};
use crate::api::{ActionTarget, RpcClient, TrytonApi};
use crate::cli::ui::{prompts, render, with_spinner};
use crate::config::Config;
use crate::error::ConsoleError;
use crate::fields::RenderHint;
use crate::form::{FormSession, hydrate};
use crate::navigation::{Navigator, SwitchOutcome, ViewState, keep_edits};
use crate::session_store::SessionStore;
use crate::view::ViewType;
use anyhow::{Context, Result};
use colored::*;
use log::{debug, warn};

pub async fn edit_command(
    config: &Config,
    store: &SessionStore,
    model: &str,
    id: i64,
    assignments: &[String],
    yes: bool,
) -> Result<()> {
    let client = connect(config, store)?;
    let mut navigator = Navigator::new();
    if let Some(ticket) = navigator.open_record(model, id, keep_edits) {
        with_spinner("Loading record...", navigator.navigate(&client, ticket, load_options(config))).await;
    }
    edit_loaded_form(config, &client, &mut navigator, assignments, yes).await
}

pub async fn create_command(
    config: &Config,
    store: &SessionStore,
    model: &str,
    assignments: &[String],
    yes: bool,
) -> Result<()> {
    let client = connect(config, store)?;
    let mut navigator = Navigator::new();
    let target = ActionTarget::window(model, ViewType::Form);
    if let Some(ticket) = navigator.begin_load(target, None, keep_edits) {
        with_spinner("Loading form...", navigator.navigate(&client, ticket, load_options(config))).await;
    }
    edit_loaded_form(config, &client, &mut navigator, assignments, yes).await
}

async fn edit_loaded_form(
    config: &Config,
    client: &RpcClient,
    navigator: &mut Navigator,
    assignments: &[String],
    yes: bool,
) -> Result<()> {
    let assignments = parse_assignments(assignments)?;
    let limit = config.settings.autocomplete_limit;

    let Some(form) = navigator.form_mut() else {
        return Err(match navigator.error() {
            Some(error) => anyhow::Error::new(error.clone()).context("Failed to open form"),
            None => anyhow::anyhow!("The server did not return a form view"),
        });
    };

    if assignments.is_empty() {
        edit_interactively(client, form, limit).await?;
    } else {
        for (field, value) in &assignments {
            apply_input(client, form, field, value, limit).await?;
        }
    }
    if let Err(e) = hydrate::resolve_pending_references(client, form).await {
        debug!("Display names unavailable: {}", e);
    }
    render::render_form(form);

    if !form.is_dirty() && !form.is_new() {
        println!("{}", "No changes".dimmed());
        return Ok(());
    }

    let save = yes || prompts::prompt_confirmation("Save changes?", true)?;
    if save {
        let saved = with_spinner("Saving...", save_form(client, form)).await;
        return match saved {
            Ok(id) => {
                println!("{} Saved {} #{}", "✓".bright_green().bold(), form.model().bright_white(), id);
                Ok(())
            }
            Err(e) => {
                render::render_form(form);
                Err(anyhow::Error::new(e).context("Save failed; your edits were kept"))
            }
        };
    }

    let (outcome, ticket) = navigator.switch_to_table(|form| {
        let changes = form.changed_payload().len();
        prompts::prompt_confirmation(&format!("Discard {} unsaved change(s)?", changes), false).unwrap_or(false)
    });
    match (outcome, ticket) {
        (SwitchOutcome::Switched, Some(ticket)) => {
            with_spinner("Loading records...", navigator.navigate(client, ticket, load_options(config))).await;
            if let ViewState::Table(table) = navigator.state() {
                render::render_table(table);
            }
        }
        _ => println!("{}", "Changes kept on screen but not saved".yellow()),
    }
    Ok(())
}

/// Store one typed value. Relation fields given as text are searched.
async fn apply_input(client: &dyn TrytonApi, form: &mut FormSession, field: &str, value: &str, limit: usize) -> Result<()> {
    let relation = form
        .architecture()
        .field(field)
        .filter(|_| form.render_hint(field) == Some(RenderHint::RelationPicker))
        .and_then(|def| def.kind.relation().map(str::to_string));

    if let Some(model) = relation {
        let text = value.trim().trim_start_matches('#');
        if !text.is_empty() && text.parse::<i64>().is_err() {
            return match pick_relation(client, &model, text, limit).await? {
                Some(id) => Ok(form.set_input(field, &id.to_string())?),
                None => Ok(()),
            };
        }
    }
    form.set_input(field, value)
        .with_context(|| format!("Cannot set '{}'", field))
}

async fn edit_interactively(client: &dyn TrytonApi, form: &mut FormSession, limit: usize) -> Result<()> {
    let editable: Vec<String> = form
        .layout()
        .field_names()
        .into_iter()
        .filter(|name| form.is_submittable(name))
        .map(str::to_string)
        .collect();
    if editable.is_empty() {
        println!("{}", "No editable fields".dimmed());
        return Ok(());
    }

    loop {
        let mut labels: Vec<String> = editable
            .iter()
            .map(|name| {
                let label = form.architecture().field(name).map(|f| f.label.as_str()).unwrap_or(name.as_str());
                format!("{}: {}", label, form.display_value(name))
            })
            .collect();
        labels.push("Done".to_string());

        let Some(index) = prompts::prompt_select("Field to edit", &labels)? else {
            return Ok(());
        };
        let Some(field) = editable.get(index) else {
            return Ok(());
        };

        let options = form.selection_options(field);
        let text = if options.is_empty() {
            prompts::prompt_field(field, &form.display_value(field))?
        } else {
            let option_labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
            match prompts::prompt_select(field, &option_labels)? {
                Some(choice) => options[choice].label.clone(),
                None => continue,
            }
        };

        if let Err(e) = apply_input(client, form, field, &text, limit).await {
            println!("{} {:#}", "✗".bright_red(), e);
        }
    }
}

/// Create or update the record behind `form`, returning its id. Nothing is
/// sent while required values are missing; server rejections are recorded
/// on the form.
pub async fn save_form(api: &dyn TrytonApi, form: &mut FormSession) -> Result<i64, ConsoleError> {
    form.check_required()?;
    let model = form.model().to_string();

    let outcome = match form.record_id() {
        Some(id) => {
            let payload = form.changed_payload();
            api.update_record(&model, id, &payload).await.map(|_| id)
        }
        None => api.create_record(&model, &form.to_wire_payload()).await,
    };

    if let Err(e) = &outcome {
        if !form.apply_server_error(e) {
            warn!("Saving {} failed: {}", model, e);
        }
    }
    outcome
}
