//! Core domain types for the skywatch game client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::Error;

/// Unique numeric identifier of a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanetId(pub u64);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlanetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for PlanetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| Error::Config(format!("invalid planet id '{}'", s)))
    }
}

/// Galactic coordinate of a celestial body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Galaxy number
    pub galaxy: u16,
    /// Solar system number within the galaxy
    pub system: u16,
    /// Orbital position within the system
    pub position: u8,
}

impl Coordinate {
    /// Create a new coordinate
    pub fn new(galaxy: u16, system: u16, position: u8) -> Self {
        Self {
            galaxy,
            system,
            position,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{}]", self.galaxy, self.system, self.position)
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    /// Parse a coordinate from its `[g:s:p]` display form (brackets optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let mut parts = trimmed.split(':');
        let err = || Error::Parse(format!("invalid coordinate '{}'", s));

        let galaxy = parts.next().and_then(|p| p.trim().parse().ok());
        let system = parts.next().and_then(|p| p.trim().parse().ok());
        let position = parts.next().and_then(|p| p.trim().parse().ok());

        match (galaxy, system, position, parts.next()) {
            (Some(galaxy), Some(system), Some(position), None) => Ok(Self {
                galaxy,
                system,
                position,
            }),
            _ => Err(err()),
        }
    }
}

/// Resource stock levels on a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Metal stock
    pub metal: i64,
    /// Crystal stock
    pub crystal: i64,
    /// Deuterium stock
    pub deuterium: i64,
    /// Current energy balance (can be negative)
    pub energy: i64,
}

/// Building field usage on a planet (developed vs. total).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fields {
    /// Fields already built on
    pub built: u32,
    /// Total fields available
    pub total: u32,
}

/// Surface temperature range of a planet, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Temperature {
    pub min: i32,
    pub max: i32,
}

/// Immutable snapshot of one planet's state at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    /// Unique planet identifier
    pub id: PlanetId,
    /// Planet name as shown in the overview
    pub name: String,
    /// Galactic coordinate
    pub coordinate: Coordinate,
    /// Diameter in kilometers
    pub diameter: u32,
    /// Building field usage
    pub fields: Fields,
    /// Surface temperature range
    pub temperature: Temperature,
    /// Resource stock levels (zeroed when not fetched)
    #[serde(default)]
    pub resources: Resources,
}

/// Result of polling for hostile activity.
///
/// `Unknown` means the backend answered but the signal could not be
/// interpreted. Callers must not treat it as `Safe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttackStatus {
    /// No hostile fleet movement reported
    Safe,
    /// At least one hostile fleet movement inbound
    UnderAttack {
        /// Number of hostile movements reported by the event box
        hostile: u32,
    },
    /// The signal was ambiguous or missing from an otherwise valid response
    Unknown,
}

impl AttackStatus {
    /// Whether hostile activity was positively detected.
    pub fn is_under_attack(&self) -> bool {
        matches!(self, Self::UnderAttack { .. })
    }

    /// Whether the poll produced a definite answer.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for AttackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "no attack"),
            Self::UnderAttack { hostile } => write!(f, "under attack ({} hostile)", hostile),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Mission type of a fleet movement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    Attack,
    GroupAttack,
    Espionage,
    Destroy,
    MissileStrike,
    /// Mission id not recognized as a combat mission
    Other(u8),
}

impl MissionType {
    /// Map a backend mission id to a mission type.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Attack,
            2 => Self::GroupAttack,
            6 => Self::Espionage,
            9 => Self::Destroy,
            10 => Self::MissileStrike,
            other => Self::Other(other),
        }
    }

    /// Whether this mission type is hostile by nature.
    pub fn is_hostile(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for MissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack => write!(f, "attack"),
            Self::GroupAttack => write!(f, "group attack"),
            Self::Espionage => write!(f, "espionage"),
            Self::Destroy => write!(f, "destroy"),
            Self::MissileStrike => write!(f, "missile strike"),
            Self::Other(id) => write!(f, "mission #{}", id),
        }
    }
}

/// One hostile fleet movement from the event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Event row identifier
    pub id: u64,
    /// Mission type of the incoming fleet
    pub mission: MissionType,
    /// Origin coordinate of the fleet
    pub origin: Coordinate,
    /// Destination coordinate (one of our celestials)
    pub destination: Coordinate,
    /// Scheduled arrival time
    pub arrival: DateTime<Utc>,
    /// Player id of the attacker, when disclosed
    pub attacker_id: Option<i64>,
    /// Number of interplanetary missiles, for missile strikes
    pub missiles: u32,
}

/// Defensive unit counts on one planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Defense {
    pub rocket_launcher: u32,
    pub light_laser: u32,
    pub heavy_laser: u32,
    pub gauss_cannon: u32,
    pub ion_cannon: u32,
    pub plasma_turret: u32,
    pub small_shield_dome: u32,
    pub large_shield_dome: u32,
    pub anti_ballistic_missile: u32,
    pub interplanetary_missile: u32,
}

impl Defense {
    /// Total number of defensive structures (missiles excluded).
    pub fn total_structures(&self) -> u32 {
        self.rocket_launcher
            + self.light_laser
            + self.heavy_laser
            + self.gauss_cannon
            + self.ion_cannon
            + self.plasma_turret
            + self.small_shield_dome
            + self.large_shield_dome
    }
}
