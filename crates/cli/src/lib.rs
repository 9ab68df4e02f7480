pub mod bootstrap;
pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use talentscout_core::config::{AppConfig, LoadOptions};

use crate::commands::chat::ChatOptions;
use crate::commands::privacy::PrivacyCommand;

#[derive(Debug, Parser)]
#[command(
    name = "talentscout",
    about = "TalentScout candidate intake CLI",
    long_about = "Run candidate screening conversations and operate the intake store: migrations, config inspection, privacy maintenance, and smoke validation.",
    after_help = "Examples:\n  talentscout chat\n  talentscout doctor --json\n  talentscout privacy cleanup --days 30"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive screening conversation on the terminal")]
    Chat {
        #[arg(long, help = "Override database.url for this session")]
        database_url: Option<String>,
        #[arg(long, help = "Discard the record instead of storing it")]
        no_persist: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, taxonomy, database, and LLM readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Privacy maintenance: report, retention cleanup, export, and erasure")]
    Privacy {
        #[command(subcommand)]
        command: PrivacyCommand,
    },
    #[command(about = "List the technology taxonomy grouped by category")]
    Taxonomy {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Commands load their own config; a broken one is reported by the command itself.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config);
    }

    let result = match cli.command {
        Command::Chat { database_url, no_persist } => {
            commands::chat::run(ChatOptions { database_url, no_persist })
        }
        Command::Migrate => commands::migrate::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Privacy { command } => commands::privacy::run(command),
        Command::Taxonomy { json } => commands::taxonomy::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
