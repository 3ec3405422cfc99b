pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "aurum",
    about = "Aurum storefront operator CLI",
    long_about = "Inspect configuration, check readiness, and price the ring catalog offline.",
    after_help = "Examples:\n  aurum doctor --json\n  aurum config\n  aurum catalog --price-min 150 --price-max 400"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog loading, and spot price credentials")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price the catalog once and print the enriched products as JSON")]
    Catalog {
        #[arg(long, help = "Lowest price to include (inclusive)")]
        price_min: Option<String>,
        #[arg(long, help = "Highest price to include (inclusive)")]
        price_max: Option<String>,
        #[arg(long, help = "Lowest 1-5 popularity rating to include (inclusive)")]
        popularity_min: Option<String>,
        #[arg(long, help = "Highest 1-5 popularity rating to include (inclusive)")]
        popularity_max: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = aurum_core::config::load_dotenv(None) {
        let result = commands::CommandResult::failure(
            "dotenv",
            "config_validation",
            error.to_string(),
            commands::EXIT_CONFIG,
        );
        println!("{}", result.output);
        return ExitCode::from(result.exit_code);
    }

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Catalog { price_min, price_max, popularity_min, popularity_max } => {
            commands::catalog::run(aurum_core::FilterQuery {
                price_min,
                price_max,
                popularity_min,
                popularity_max,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
