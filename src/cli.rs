use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "callview")]
#[command(author, version, about = "Lightweight viewer for Callgrind profile dumps")]
pub struct Cli {
    /// Callgrind output file to load
    pub file: PathBuf,

    /// Maximum number of entries to print
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
