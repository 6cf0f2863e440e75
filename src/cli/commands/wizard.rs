use super::connect;
use crate::api::TrytonApi;
use crate::cli::ui::{prompts, render, with_spinner};
use crate::config::Config;
use crate::session_store::SessionStore;
use crate::wizard::{WizardPhase, WizardSession};
use anyhow::{Context, Result};
use colored::*;

pub async fn wizard_command(config: &Config, store: &SessionStore, name: &str) -> Result<()> {
    let client = connect(config, store)?;
    run_wizard(config, &client, name).await
}

/// Walk through a wizard until it finishes or the user cancels
pub async fn run_wizard(config: &Config, api: &dyn TrytonApi, name: &str) -> Result<()> {
    let mut session = with_spinner(
        "Starting wizard...",
        WizardSession::start(api, name, config.settings.relation_page_size),
    )
    .await
    .with_context(|| format!("Failed to start wizard '{}'", name))?;

    loop {
        let WizardPhase::Form { state, form, buttons } = session.phase() else {
            break;
        };
        println!("{} {}", "Step:".dimmed(), state.bright_cyan());
        render::render_form(form);

        let mut labels: Vec<String> = vec!["Edit a field".to_string()];
        labels.extend(buttons.iter().map(|b| {
            if b.default {
                format!("{} ⏎", b.label)
            } else {
                b.label.clone()
            }
        }));
        let Some(choice) = prompts::prompt_select("Action", &labels)? else {
            break;
        };

        if choice == 0 {
            edit_wizard_field(&mut session)?;
            continue;
        }
        let button_state = buttons[choice - 1].state.clone();
        let result = with_spinner("Working...", session.press(api, &button_state)).await;
        if let Err(e) = result {
            println!("{} {}", "✗".bright_red().bold(), e.to_string().red());
            if session.is_finished() {
                return Err(anyhow::Error::new(e).context("Wizard aborted"));
            }
        }
    }

    if let WizardPhase::Finished { actions } = session.phase() {
        println!(
            "{} Wizard {} finished{}",
            "✓".bright_green().bold(),
            name.bright_white().bold(),
            if actions.is_empty() {
                String::new()
            } else {
                format!(" ({} follow-up action(s) not run in the console)", actions.len())
            }
        );
    } else {
        session.cancel(api).await;
        println!("{}", "Wizard cancelled".yellow());
    }
    Ok(())
}

fn edit_wizard_field(session: &mut WizardSession) -> Result<()> {
    let Some(form) = session.form_mut() else {
        return Ok(());
    };
    let fields: Vec<String> = form
        .layout()
        .field_names()
        .into_iter()
        .filter(|name| form.is_submittable(name))
        .map(str::to_string)
        .collect();
    let Some(index) = prompts::prompt_select("Field", &fields)? else {
        println!("{}", "This step has no editable fields".dimmed());
        return Ok(());
    };
    let field = &fields[index];
    let text = prompts::prompt_field(field, &form.display_value(field))?;
    if let Err(e) = form.set_input(field, &text) {
        println!("{} {}", "✗".bright_red(), e.to_string().red());
    }
    Ok(())
}
