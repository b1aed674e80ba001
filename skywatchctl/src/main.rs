//! Skywatch CLI
//!
//! Thin harness over the game client: reads credentials from the
//! environment, connects, and runs one subcommand.

use anyhow::Result;
use clap::Parser;
use skywatchctl::cli::{
    generate_completion, handle_attacks, handle_defense, handle_planet, handle_planets,
    handle_status, handle_watch, Cli, Commands, OutputFormat,
};
use skywatchctl::client::GameClient;
use skywatchctl::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completion needs neither credentials nor a connection
    if let Commands::Completion { shell } = &cli.command {
        generate_completion(*shell);
        return Ok(());
    }

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = CliConfig::builder();
    builder = builder.with_config_file(!cli.no_config)?;
    builder = builder.with_env_overrides();

    if let Some(ref lobby) = cli.lobby {
        builder = builder.with_lobby_url(lobby)?;
    }
    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if let Some(verbose) = cli.verbose {
        builder = builder.with_verbose(verbose);
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    // Credential loading is a CLI concern; the client itself only ever
    // receives credentials as explicit parameters.
    let universe = require_env("UNIVERSE");
    let username = require_env("USERNAME");
    let password = require_env("PASSWORD");

    let client = match GameClient::connect(&universe, &username, &password, config.client_config())
        .await
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: cannot connect to universe '{}'", universe);
            eprintln!("Connection error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Planet { id } => handle_planet(&client, id, &output_format).await,
        Commands::Planets => handle_planets(&client, &output_format).await,
        Commands::Status => handle_status(&client, &output_format).await,
        Commands::Watch { interval } => handle_watch(&client, interval, &output_format).await,
        Commands::Attacks => handle_attacks(&client, &output_format).await,
        Commands::Defense { id } => handle_defense(&client, id, &output_format).await,
        Commands::Completion { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if config.verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn require_env(name: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            eprintln!("Error: {} environment variable is not set", name);
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
