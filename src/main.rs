use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autorule::cli::args::{Cli, Commands};
use autorule::cli::commands;
use autorule::config::Config;
use autorule::features::automation::EngineConfig;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.engine.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    config.general.color.apply();

    let format = cli.output.unwrap_or(config.general.default_output);
    let user = cli.user.or(config.general.current_user);
    let engine = EngineConfig::from(&config.engine);

    let output = match cli.command {
        Commands::Rule(args) => commands::rule(args.command, engine, format)?,
        Commands::Record(args) => commands::record(args.command, engine, user, format)?,
        Commands::Prefs(args) => commands::prefs(args.command, user, format)?,
        Commands::Completions { shell } => commands::completions(shell)?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
