use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mfbook::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Bearer token issued by `register`
    #[arg(long, global = true, env = "MFBOOK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for mfbook::AppCommand {
    fn from(cmd: Commands) -> mfbook::AppCommand {
        match cmd {
            Commands::Register { username } => mfbook::AppCommand::Register { username },
            Commands::Search { query } => mfbook::AppCommand::Search {
                query: query.join(" "),
            },
            Commands::Details { scheme_code } => mfbook::AppCommand::Details { scheme_code },
            Commands::Save {
                scheme_code,
                fund_id,
            } => mfbook::AppCommand::Save {
                scheme_code,
                fund_id,
            },
            Commands::Saved { nav } => mfbook::AppCommand::Saved { with_nav: nav },
            Commands::Remove { fund_id } => mfbook::AppCommand::Remove { fund_id },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Register a user and print its token
    Register { username: String },
    /// Search mutual funds, or list all of them without a query
    Search { query: Vec<String> },
    /// Show fund details, returns and NAV history
    Details { scheme_code: String },
    /// Save a fund to your list
    Save {
        scheme_code: String,
        /// Identifier to save the fund under, defaults to the scheme code
        #[arg(long)]
        fund_id: Option<String>,
    },
    /// List your saved funds
    Saved {
        /// Also fetch the latest NAV of each fund
        #[arg(long)]
        nav: bool,
    },
    /// Remove a fund from your list
    Remove { fund_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => mfbook::cli::setup::setup(),
        Some(cmd) => {
            mfbook::run_command(
                cmd.into(),
                cli.config_path.as_deref(),
                cli.token.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
