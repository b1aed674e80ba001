//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use skywatch_core::{AttackEvent, AttackStatus, Defense, Planet};

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Format a single planet snapshot
pub fn format_planet(planet: &Planet, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(planet)?),
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&format!("{} {}", planet.name.bold(), planet.coordinate));
            output.push('\n');
            output.push_str(&format!("ID: {}", planet.id.to_string().cyan()));
            output.push('\n');
            output.push_str(&format!(
                "Diameter: {} km, fields {}/{}",
                planet.diameter.to_string().yellow(),
                planet.fields.built,
                planet.fields.total
            ));
            output.push('\n');
            output.push_str(&format!(
                "Temperature: {}°C to {}°C",
                planet.temperature.min, planet.temperature.max
            ));
            output.push('\n');
            output.push_str(&format!(
                "Metal: {}, Crystal: {}, Deuterium: {}, Energy: {}",
                planet.resources.metal.to_string().cyan(),
                planet.resources.crystal.to_string().cyan(),
                planet.resources.deuterium.to_string().cyan(),
                if planet.resources.energy < 0 {
                    planet.resources.energy.to_string().red()
                } else {
                    planet.resources.energy.to_string().green()
                }
            ));
            Ok(output)
        }
    }
}

/// Format the planet list
pub fn format_planets(planets: &[Planet], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(planets)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct PlanetRow {
                #[tabled(rename = "ID")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Coords")]
                coords: String,
                #[tabled(rename = "Diameter")]
                diameter: String,
                #[tabled(rename = "Fields")]
                fields: String,
            }

            let rows: Vec<PlanetRow> = planets
                .iter()
                .map(|planet| PlanetRow {
                    id: planet.id.to_string(),
                    name: planet.name.clone(),
                    coords: planet.coordinate.to_string(),
                    diameter: format!("{} km", planet.diameter),
                    fields: format!("{}/{}", planet.fields.built, planet.fields.total),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            Ok(table.to_string())
        }
    }
}

/// Format the attack status
pub fn format_attack_status(status: &AttackStatus, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Table => Ok(match status {
            AttackStatus::Safe => status.to_string().green().to_string(),
            AttackStatus::UnderAttack { .. } => status.to_string().red().bold().to_string(),
            AttackStatus::Unknown => status.to_string().yellow().to_string(),
        }),
    }
}

/// Format the incoming attack list
pub fn format_attacks(attacks: &[AttackEvent], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(attacks)?),
        OutputFormat::Table => {
            if attacks.is_empty() {
                return Ok("No hostile fleet movements".green().to_string());
            }

            #[derive(Tabled)]
            struct AttackRow {
                #[tabled(rename = "Mission")]
                mission: String,
                #[tabled(rename = "Origin")]
                origin: String,
                #[tabled(rename = "Destination")]
                destination: String,
                #[tabled(rename = "Arrival (UTC)")]
                arrival: String,
                #[tabled(rename = "Attacker")]
                attacker: String,
            }

            let rows: Vec<AttackRow> = attacks
                .iter()
                .map(|attack| AttackRow {
                    mission: attack.mission.to_string(),
                    origin: attack.origin.to_string(),
                    destination: attack.destination.to_string(),
                    arrival: attack.arrival.format("%Y-%m-%d %H:%M:%S").to_string(),
                    attacker: attack
                        .attacker_id
                        .map_or_else(|| "-".to_string(), |id| id.to_string()),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            Ok(table.to_string())
        }
    }
}

/// Format the defense summary of a planet
pub fn format_defense(defense: &Defense, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(defense)?),
        OutputFormat::Table => {
            let mut output = String::new();
            let rows = [
                ("Rocket launcher", defense.rocket_launcher),
                ("Light laser", defense.light_laser),
                ("Heavy laser", defense.heavy_laser),
                ("Gauss cannon", defense.gauss_cannon),
                ("Ion cannon", defense.ion_cannon),
                ("Plasma turret", defense.plasma_turret),
                ("Small shield dome", defense.small_shield_dome),
                ("Large shield dome", defense.large_shield_dome),
                ("Anti-ballistic missile", defense.anti_ballistic_missile),
                ("Interplanetary missile", defense.interplanetary_missile),
            ];
            for (name, count) in rows {
                if count > 0 {
                    output.push_str(&format!("{:<24} {}\n", name, count.to_string().cyan()));
                }
            }
            if output.is_empty() {
                output.push_str(&"No defenses built".yellow().to_string());
            }
            output.push_str(&format!(
                "\nTotal structures: {}",
                defense.total_structures().to_string().bold()
            ));
            Ok(output)
        }
    }
}
