use super::{connect, load_options, wizard};
use crate::api::{ActionTarget, TrytonApi};
use crate::cli::ui::{prompts, render, with_spinner};
use crate::config::Config;
use crate::navigation::{MenuOutcome, Navigator, ViewState, keep_edits};
use crate::session_store::SessionStore;
use crate::view::ViewType;
use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;

pub async fn menu_command(config: &Config, store: &SessionStore, open: Option<i64>) -> Result<()> {
    let client = connect(config, store)?;
    let mut navigator = Navigator::new();
    with_spinner("Loading menu...", navigator.load_menu(&client))
        .await
        .context("Failed to load menu")?;

    let Some(menu_id) = open else {
        // Show every level when nothing is being opened
        let ids: Vec<i64> = navigator.menu.visible().iter().map(|(_, n)| n.id).collect();
        expand_all(&mut navigator, ids);
        render::render_menu(&navigator.menu);
        return Ok(());
    };

    let mut outcome = with_spinner("Opening...", navigator.select_menu(&client, menu_id, keep_edits))
        .await
        .with_context(|| format!("Failed to open menu entry #{}", menu_id))?;

    loop {
        match outcome {
            MenuOutcome::Toggled { .. } => {
                render::render_menu(&navigator.menu);
                return Ok(());
            }
            MenuOutcome::Dashboard => {
                println!("{}", "This menu entry does not open anything".dimmed());
                return Ok(());
            }
            MenuOutcome::Stayed => {
                println!("{}", "Unsaved changes kept".yellow());
                return Ok(());
            }
            MenuOutcome::Choose(candidates) => {
                let labels: Vec<String> = candidates.iter().map(describe_target).collect();
                let Some(index) = prompts::prompt_select("Several views match, pick one", &labels)? else {
                    return Ok(());
                };
                outcome = navigator.choose(index, keep_edits)?;
            }
            MenuOutcome::Wizard { name, wizard } => {
                println!("{} {}", "🧙".bright_blue(), name.bright_white().bold());
                return wizard::run_wizard(config, &client, &wizard).await;
            }
            MenuOutcome::Load(ticket) => {
                with_spinner("Loading view...", navigator.navigate(&client, ticket, load_options(config))).await;
                return show_state(&navigator);
            }
        }
    }
}

fn expand_all(navigator: &mut Navigator, mut pending: Vec<i64>) {
    while let Some(id) = pending.pop() {
        let Some(node) = navigator.menu.find(id) else {
            continue;
        };
        if node.is_leaf() || navigator.menu.is_expanded(id) {
            continue;
        }
        pending.extend(node.children.iter().map(|c| c.id));
        navigator.menu.toggle(id);
    }
}

fn describe_target(target: &ActionTarget) -> String {
    match target {
        ActionTarget::Window { name, model, view_type, .. } => {
            format!("{} ({} {})", name, model, view_type.as_str())
        }
        ActionTarget::Wizard { name, wizard } => format!("{} (wizard {})", name, wizard),
    }
}

/// Print whatever the navigator ended up showing
fn show_state(navigator: &Navigator) -> Result<()> {
    match navigator.state() {
        ViewState::Table(table) => render::render_table(table),
        ViewState::Form(form) => render::render_form(form),
        ViewState::Loading { .. } => println!("{}", "Still loading".dimmed()),
        ViewState::Dashboard => {
            if let Some(error) = navigator.error() {
                let hint = if error.is_retryable() { " (run the command again to retry)" } else { "" };
                return Err(anyhow::Error::new(error.clone()).context(format!("Failed to load view{}", hint)));
            }
            println!("{}", "Nothing to show".dimmed());
        }
    }
    Ok(())
}

pub async fn list_command(
    config: &Config,
    store: &SessionStore,
    model: &str,
    limit: Option<usize>,
    domain: Option<&str>,
) -> Result<()> {
    let client = connect(config, store)?;
    let domain: Value = match domain {
        Some(text) => serde_json::from_str(text).with_context(|| format!("Invalid domain JSON: {}", text))?,
        None => Value::Array(Vec::new()),
    };

    let mut options = load_options(config);
    if let Some(limit) = limit {
        options.list_limit = limit;
    }

    let mut navigator = Navigator::new();
    let target = ActionTarget::Window {
        name: model.to_string(),
        model: model.to_string(),
        view_id: None,
        view_type: ViewType::Tree,
        domain,
    };
    if let Some(ticket) = navigator.begin_load(target, None, keep_edits) {
        with_spinner("Loading records...", navigator.navigate(&client, ticket, options)).await;
    }
    show_state(&navigator)
}

pub async fn show_command(config: &Config, store: &SessionStore, model: &str, id: i64) -> Result<()> {
    let client = connect(config, store)?;
    let mut navigator = Navigator::new();
    if let Some(ticket) = navigator.open_record(model, id, keep_edits) {
        with_spinner("Loading record...", navigator.navigate(&client, ticket, load_options(config))).await;
    }
    show_state(&navigator)
}

/// Offer typeahead matches for a relation field
pub async fn pick_relation(
    api: &dyn TrytonApi,
    model: &str,
    text: &str,
    limit: usize,
) -> Result<Option<i64>> {
    let matches = api
        .autocomplete(model, text, &Value::Array(Vec::new()), limit)
        .await
        .with_context(|| format!("Search on '{}' failed", model))?;
    if matches.is_empty() {
        println!("{} No {} matches '{}'", "✗".bright_red(), model, text);
        return Ok(None);
    }
    let labels: Vec<String> = matches.iter().map(|r| format!("{} [#{}]", r.display_name, r.id)).collect();
    Ok(prompts::prompt_select(&format!("Select {}", model), &labels)?.map(|i| matches[i].id))
}
