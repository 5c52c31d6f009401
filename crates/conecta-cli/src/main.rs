mod app;
mod cli;
mod config;
mod students;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    app::App,
    cli::{Command, ConfigCommand, OutputArgs, StudentCommand},
};

/// Entry point: the coordinator that owns the provider for the whole run.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let command = cli
        .command
        .unwrap_or(Command::Student(StudentCommand::List(OutputArgs::default())));

    match command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Health => {
            let app = App::start(&config).await?;
            let outcome = app.health();
            app.shutdown()?;
            println!("Storage: ok (unit {})", outcome?);
            println!("Encryption: ok");
        }
        Command::Student(cmd) => {
            let app = App::start(&config).await?;
            let outcome = students::handle(cmd, &app);
            app.shutdown()?;
            outcome?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("conecta {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    info!(path = %path.display(), "config initialized");
    println!("Config initialized at {}", path.display());
    Ok(())
}
