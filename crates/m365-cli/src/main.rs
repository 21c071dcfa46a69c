mod cmd;
mod context;
mod output;
mod rate_limit;
mod tools;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, templates::TemplatesSubcommand};
use m365_core::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "m365-admin",
    about = "Microsoft 365 administration tools served over MCP: users, email templates, teams",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (default: ./m365-admin.yaml when present)
    #[arg(long, global = true, env = "M365_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as an MCP stdio server
    Mcp,

    /// Create the local database schema
    InitDb {
        /// Delete and recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Manage email templates
    Templates {
        #[command(subcommand)]
        subcommand: TemplatesSubcommand,
    },

    /// Probe Microsoft Graph and print the health report
    Health,

    /// List the tools exposed over MCP
    Tools,

    /// Show the most recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Create, validate or show the settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    // stdout carries the MCP protocol; logs always go to stderr.
    let default_directive = match &cli.command {
        Commands::Mcp => settings.tracing_directive(),
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Mcp => cmd::mcp::run(settings),
        Commands::InitDb { force } => cmd::init_db::run(&settings, force),
        Commands::Templates { subcommand } => cmd::templates::run(settings, subcommand, cli.json),
        Commands::Health => cmd::health::run(settings),
        Commands::Tools => cmd::tools::run(cli.json),
        Commands::Audit { limit } => cmd::audit::run(&settings, limit, cli.json),
        Commands::Config { subcommand } => {
            cmd::config::run(cli.config.as_deref(), &settings, subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
