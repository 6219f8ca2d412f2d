use std::process::ExitCode;

use callview::cli::Cli;
use callview::output::{format_human, format_json};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse_args();

    let model = match callview::parse_path(&cli.file) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        println!("{}", format_json(&model));
    } else {
        println!("{}", format_human(&model, cli.limit));
    }

    ExitCode::SUCCESS
}
