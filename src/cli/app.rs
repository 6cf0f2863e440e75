use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tryton-console")]
#[command(about = "Browse and edit records on a Tryton server from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and remember the session
    Login(LoginArgs),
    /// End the saved session
    Logout,
    /// Show the saved session and configuration
    Status,
    /// Show the navigation menu, optionally opening an entry
    Menu {
        /// Menu entry id to open
        #[arg(short, long)]
        open: Option<i64>,
    },
    /// List records of a model
    List {
        /// Model name, e.g. party.party
        model: String,
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
        /// Search domain as JSON, e.g. '[["name", "ilike", "%acme%"]]'
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// Show one record
    Show {
        model: String,
        id: i64,
    },
    /// Edit one record
    Edit {
        model: String,
        id: i64,
        /// Field assignments as field=value
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Save without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Create a record
    Create {
        model: String,
        /// Field assignments as field=value
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Save without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Run a wizard, e.g. party.merge
    Wizard {
        name: String,
    },
}

#[derive(Args)]
pub struct LoginArgs {
    /// Server URL, e.g. https://erp.example.org
    #[arg(long)]
    pub url: Option<String>,
    #[arg(short, long)]
    pub database: Option<String>,
    #[arg(short, long)]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_assignments() {
        let cli = Cli::try_parse_from([
            "tryton-console", "edit", "party.party", "7", "--set", "name=Acme", "-s", "active=no",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { model, id, set, yes } => {
                assert_eq!(model, "party.party");
                assert_eq!(id, 7);
                assert_eq!(set, vec!["name=Acme", "active=no"]);
                assert!(!yes);
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn test_parse_list_limit() {
        let cli = Cli::try_parse_from(["tryton-console", "list", "party.party", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::List { limit: Some(5), .. }));
    }
}
