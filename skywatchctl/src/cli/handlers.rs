//! Command execution handlers

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use skywatch_core::{Error, PlanetId};

use crate::client::GameClient;
use crate::format;

use super::commands::*;

/// Handle planet command
pub async fn handle_planet(client: &GameClient, id: u64, format: &OutputFormat) -> Result<()> {
    let planet = client.get_planet(PlanetId(id)).await?;
    println!("{}", format::format_planet(&planet, &format.into())?);
    Ok(())
}

/// Handle planets command
pub async fn handle_planets(client: &GameClient, format: &OutputFormat) -> Result<()> {
    let planets = client.get_planets().await?;
    println!("{}", format::format_planets(&planets, &format.into())?);
    Ok(())
}

/// Handle status command
pub async fn handle_status(client: &GameClient, format: &OutputFormat) -> Result<()> {
    let status = client.is_under_attack().await?;
    println!("{}", format::format_attack_status(&status, &format.into())?);
    Ok(())
}

/// Handle watch command: poll the attack status until interrupted.
///
/// A single failed poll is logged and does not terminate the monitor;
/// only a dead session (logout or rejected re-authentication) does.
pub async fn handle_watch(client: &GameClient, interval: u64, format: &OutputFormat) -> Result<()> {
    let period = Duration::from_secs(interval.max(1));
    info!(interval_secs = period.as_secs(), "watching for hostile activity");

    loop {
        match client.is_under_attack().await {
            Ok(status) => {
                println!("{}", format::format_attack_status(&status, &format.into())?);
            }
            Err(err @ (Error::NotConnected | Error::Auth(_))) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(error = %err, "attack poll failed");
            }
        }
        tokio::time::sleep(period).await;
    }
}

/// Handle attacks command
pub async fn handle_attacks(client: &GameClient, format: &OutputFormat) -> Result<()> {
    let attacks = client.get_attacks().await?;
    println!("{}", format::format_attacks(&attacks, &format.into())?);
    Ok(())
}

/// Handle defense command
pub async fn handle_defense(client: &GameClient, id: u64, format: &OutputFormat) -> Result<()> {
    let defense = client.get_defense(PlanetId(id)).await?;
    println!("{}", format::format_defense(&defense, &format.into())?);
    Ok(())
}

/// Generate shell completion scripts
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
