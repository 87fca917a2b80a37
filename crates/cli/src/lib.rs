pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "salescast",
    about = "Salescast operator CLI",
    long_about = "Inspect configuration, apply migrations and import sales history for Salescast.",
    after_help = "Examples:\n  salescast config\n  salescast sample > sales.csv\n  salescast import sales.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the sample sales CSV")]
    Sample,
    #[command(about = "Normalize a sales CSV and upsert its rows into the store")]
    Import {
        #[arg(help = "Path to the CSV file")]
        file: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Sample => commands::sample::run(),
        Command::Import { file } => commands::import::run(&file),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
