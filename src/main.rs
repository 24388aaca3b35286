mod app;
mod cli;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::App;
use crate::cli::Cli;
use qagen::config::{Config, LoggingConfig};

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let json_layer = logging
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!logging.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(cmd) => {
            let config = Config::load()?;
            init_tracing(&config.logging, cli.verbose);
            let mut app = App::new(config).await?;
            app.run_command(cmd).await?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
