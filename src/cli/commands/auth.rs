use crate::cli::app::LoginArgs;
use crate::cli::ui::{prompts, with_spinner};
use crate::api::{RpcClient, SessionContext};
use crate::config::{self, Config};
use crate::session_store::{SessionStore, StoredSession};
use anyhow::{Context, Result};
use colored::*;
use log::{info, warn};

pub async fn login_command(args: LoginArgs, config: &mut Config, store: &SessionStore) -> Result<()> {
    let url = prompts::prompt_or(args.url.or_else(|| config.server.url.clone()), "Server URL")?;
    let database = prompts::prompt_or(args.database.or_else(|| config.server.database.clone()), "Database")?;
    let username = prompts::prompt_or(args.username.or_else(|| config.server.username.clone()), "Username")?;
    let password = match config::env_password() {
        Some(password) => password,
        None => prompts::prompt_password("Password")?,
    };

    let mut context = SessionContext::new(url.trim_end_matches('/'), database.as_str());
    context.language = config.settings.language.clone();

    let client = with_spinner(
        "Logging in...",
        RpcClient::login(context, &username, &password, config.settings.request_timeout()),
    )
    .await
    .with_context(|| format!("Login to '{}' failed", database))?;

    let stored = StoredSession::from_context(client.context()).context("Login returned no session")?;
    store.save(&stored)?;
    config.remember_server(&stored.url, &stored.database, &stored.username);
    config.save()?;

    info!("Logged in as {} (user id {})", stored.username, stored.user_id);
    println!(
        "{} Logged in to {} as {}",
        "✓".bright_green().bold(),
        stored.database.bright_yellow().bold(),
        stored.username.bright_white().bold()
    );
    Ok(())
}

pub async fn logout_command(config: &Config, store: &SessionStore) -> Result<()> {
    let Some(stored) = store.load()? else {
        println!("{}", "Not logged in".dimmed());
        return Ok(());
    };

    let context = stored.into_context(&config.settings.language);
    let client = RpcClient::new(context, config.settings.request_timeout())?;
    if let Err(e) = with_spinner("Logging out...", client.logout()).await {
        warn!("Server-side logout failed: {}", e);
    }
    store.clear()?;
    println!("{} Logged out", "✓".bright_green().bold());
    Ok(())
}

pub fn status_command(config: &Config, store: &SessionStore) -> Result<()> {
    println!("{}", "Tryton Console Status".bright_blue().bold());
    println!("{}", "═════════════════════".bright_blue());

    match store.load()? {
        Some(stored) => {
            println!("{} {}", "Server:".dimmed(), stored.url.bright_white());
            println!("{} {}", "Database:".dimmed(), stored.database.bright_white());
            println!(
                "{} {} {}",
                "User:".dimmed(),
                stored.username.bright_white().bold(),
                format!("(id {})", stored.user_id).dimmed()
            );
        }
        None => {
            println!("{} {}", "Session:".dimmed(), "Not logged in".bright_red());
            if let Some(url) = &config.server.url {
                println!("{} {}", "Last server:".dimmed(), url);
            }
        }
    }

    println!();
    println!("{} {}", "List limit:".dimmed(), config.settings.list_limit);
    println!("{} {}", "Language:".dimmed(), config.settings.language);
    println!("{} {:?}", "Session file:".dimmed(), store.path());
    Ok(())
}
