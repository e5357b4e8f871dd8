use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Load test a REST endpoint and gate on failure ratio and response times.")]
pub struct Cli {
    /// Read overrides from this dotenv file instead of the workspace `.env`.
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Print the resolved settings as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}
