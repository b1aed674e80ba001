//! Skywatch CLI Library
//!
//! This library provides the session-holding game client behind the
//! `skywatchctl` tool.
//!
//! # Public API
//!
//! The primary public API is [`client::GameClient`], which logs into an
//! OGame-style universe and exposes typed queries over it. Configuration
//! types are available via [`config::CliConfig`] and
//! [`config::ConfigBuilder`].
//!
//! ```no_run
//! use skywatchctl::client::{ClientConfig, GameClient};
//! use skywatch_core::PlanetId;
//!
//! # async fn example() -> skywatch_core::Result<()> {
//! let client = GameClient::connect(
//!     "Uni42",
//!     "alice@example.com",
//!     "secret",
//!     ClientConfig::default(),
//! )
//! .await?;
//!
//! let planet = client.get_planet(PlanetId(33620)).await?;
//! println!("{} is at {}", planet.name, planet.coordinate);
//!
//! let status = client.is_under_attack().await?;
//! println!("attack status: {}", status);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Session-holding client facade for the game server.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// Login lifecycle and session ownership.
pub mod session;

/// Paced, retrying HTTP transport.
pub mod transport;
