//! Wire models for the lobby and game-server endpoints
//!
//! These mirror backend-defined JSON payloads and are treated as versioned
//! and fragile. Nothing outside the parser and the transport should depend
//! on their exact shape.

use serde::{Deserialize, Serialize};

/// Bearer token returned by the lobby sessions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque lobby bearer token
    pub token: String,
}

/// One game server ("universe") as listed by the lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server number, unique per language
    pub number: u32,
    /// Public universe name
    pub name: String,
    /// Server language code (e.g. "en")
    pub language: String,
}

/// Server reference embedded in an account entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountServer {
    pub number: u32,
    pub language: String,
}

/// One game account tied to the lobby user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account (player) identifier
    pub id: u64,
    /// In-game player name
    #[serde(default)]
    pub name: String,
    /// Server this account lives on
    pub server: AccountServer,
}

/// One-shot login link into the game server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLinkResponse {
    pub url: String,
}

/// Compact fleet-movement summary polled for attack detection.
///
/// All counters are optional: the backend has been observed to omit fields,
/// and an absent `hostile` count must map to an undetermined status rather
/// than "safe".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventboxResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostile: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutral: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly: Option<u32>,
}

/// Per-resource slot in the resources payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSlot {
    pub resources: ResourceAmounts,
}

/// Stock figures for one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceAmounts {
    /// Current stock
    pub actual: i64,
    /// Storage capacity (absent for energy)
    #[serde(default)]
    pub max: i64,
    /// Hourly production rate (absent for energy)
    #[serde(default)]
    pub production: f64,
}

/// Resources payload for one planet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesResponse {
    pub metal: ResourceSlot,
    pub crystal: ResourceSlot,
    pub deuterium: ResourceSlot,
    pub energy: ResourceSlot,
}
