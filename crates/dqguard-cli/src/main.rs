use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dqguard_cli::run::{run_check, CheckArgs};
use dqguard_cli::CliError;

#[derive(Parser, Debug)]
#[command(name = "dqguard", version, about = "Data-quality checks and guardrailed fixes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a rule file against a CSV dataset.
    Check(CheckArgs),
    /// Print the JSON Schema for rule files.
    Schema,
}

fn main() -> Result<(), CliError> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Check(args) => {
            run_check(args)?;
            Ok(())
        }
        Command::Schema => {
            let schema = dqguard_rules::rules_json_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
