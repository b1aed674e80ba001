//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};

/// Skywatch attack monitor CLI
#[derive(Parser, Debug)]
#[command(name = "skywatchctl")]
#[command(version, about = "Planet state and attack monitor for OGame-style universes", long_about = None)]
pub struct Cli {
    /// Lobby URL (overrides config file)
    #[arg(short, long)]
    pub lobby: Option<String>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show one planet's state, including resources
    Planet {
        /// Planet identifier
        id: u64,
    },

    /// List all planets of the account
    Planets,

    /// Check whether the account is under attack
    Status,

    /// Poll the attack status on an interval
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value_t = 60)]
        interval: u64,
    },

    /// List incoming hostile fleet movements
    Attacks,

    /// Show one planet's defenses
    Defense {
        /// Planet identifier
        id: u64,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
