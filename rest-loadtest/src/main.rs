use anyhow::Context;
use clap::Parser;
use rest_loadtest::{cli::Cli, logging, ConfigResolver, LogLevel};
use std::process::ExitCode;
#[allow(unused)]
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let resolver = match &cli.env_file {
        Some(path) => ConfigResolver::with_dotenv(path),
        None => ConfigResolver::locate(),
    };

    let settings = match resolver.load() {
        Ok(settings) => settings,
        Err(err) => {
            logging::init(LogLevel::default());
            return Err(err).context("Unable to resolve settings");
        }
    };
    logging::init(settings.log_level);

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(ExitCode::SUCCESS);
    }

    match resolver.dotenv_path() {
        Some(path) => debug!("Settings overrides from {}", path.display()),
        None => debug!("No dotenv file; using defaults and environment"),
    }
    info!(
        "Starting {} ({}) against {}",
        settings.app_name, settings.env_state, settings.host
    );
    if !settings.headless {
        warn!("No web UI is available; running headless.");
    }

    let report = rest_loadtest::run(&settings)
        .await
        .context("Unable to start the load test")?;

    Ok(report.exit_code())
}
