mod commands;
mod display;
mod progress;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dsu_core::{Config, DsuError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dsu", version)]
#[command(about = "Dependency update safety check for Go modules", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Enable debug logging")]
    dev: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "N", help = "Dependencies analyzed at the same time")]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Preview license and vulnerability changes of available updates")]
    Preview(commands::Preview),

    #[command(about = "Analyze licenses and vulnerabilities of current dependencies")]
    Analyze(commands::Analyze),

    #[command(about = "Print the effective configuration")]
    Config(commands::ShowConfig),
}

impl Commands {
    fn project_dir(&self) -> PathBuf {
        let path = match self {
            Commands::Preview(cmd) => cmd.path.clone(),
            Commands::Analyze(cmd) => cmd.path.clone(),
            Commands::Config(_) => None,
        };
        path.unwrap_or_else(|| PathBuf::from("."))
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let project_dir = cli.command.project_dir();
    let config_file = Config::discover(cli.config.as_deref(), &project_dir);

    let mut config = Config::load(cli.config.as_deref(), &project_dir)?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if cli.dev {
        config.log_level = "debug".to_string();
    }
    config.validate(config_file.as_deref())?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Preview(cmd) => cmd.run(&config).await,
        Commands::Analyze(cmd) => cmd.run(&config).await,
        Commands::Config(cmd) => cmd.run(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<DsuError>() {
                Some(DsuError::RateLimited { .. }) => {
                    eprintln!("{}", "vulnerability lookup quota exceeded".red().bold());
                }
                _ => eprintln!("{} {:#}", "error:".red().bold(), err),
            }
            ExitCode::FAILURE
        }
    }
}
