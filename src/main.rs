use anyhow::Result;
use clap::Parser;
use colored::*;
use log::{error, info};

use tryton_console::cli::commands::{self, auth, browse, record, wizard};
use tryton_console::cli::{Cli, Commands};
use tryton_console::config::Config;
use tryton_console::session_store::SessionStore;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Log to file, truncated on each run
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("tryton-console.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    info!("Starting tryton-console");

    let mut config = Config::load()?;
    config.apply_env();
    let store = SessionStore::open_default()?;

    let result = match cli.command {
        Commands::Login(args) => auth::login_command(args, &mut config, &store).await,
        Commands::Logout => auth::logout_command(&config, &store).await,
        Commands::Status => auth::status_command(&config, &store),
        Commands::Menu { open } => browse::menu_command(&config, &store, open).await,
        Commands::List { model, limit, domain } => {
            browse::list_command(&config, &store, &model, limit, domain.as_deref()).await
        }
        Commands::Show { model, id } => browse::show_command(&config, &store, &model, id).await,
        Commands::Edit { model, id, set, yes } => {
            record::edit_command(&config, &store, &model, id, &set, yes).await
        }
        Commands::Create { model, set, yes } => record::create_command(&config, &store, &model, &set, yes).await,
        Commands::Wizard { name } => wizard::wizard_command(&config, &store, &name).await,
    };

    if let Err(e) = &result {
        if commands::is_auth_expired(e) {
            store.clear()?;
            eprintln!(
                "{} {}",
                "Session expired.".yellow().bold(),
                "Run `tryton-console login` to sign in again.".yellow()
            );
        }
    }
    result
}
