//! Decoders for raw game-server responses
//!
//! All functions in this module are pure: given identical raw input they
//! produce identical output, which keeps them golden-testable against
//! captured server responses. They never panic on malformed input; schema
//! drift surfaces as [`Error::Parse`].

use once_cell::sync::Lazy;
use regex::Regex;

use chrono::{DateTime, Utc};

use crate::api::{EventboxResponse, ResourcesResponse};
use crate::error::{Error, Result};
use crate::types::{
    AttackEvent, AttackStatus, Coordinate, Defense, Fields, MissionType, Planet, PlanetId,
    Resources, Temperature,
};

static SESSION_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta\s+name="ogame-session"\s+content="([^"]+)""#).unwrap());

static PLANET_DIV_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<div[^>]*?id="planet-(\d+)"[^>]*>"#).unwrap());

static PLANET_TITLE_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]*?title="([^"]*)""#).unwrap());

// Name, coordinate, diameter, fields and temperature range out of the
// decoded planet-link tooltip, e.g.
// `Homeworld [1:123:7] 12.800km (163/188) -17°C to 23°C`
static PLANET_INFOS_RGX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^\s*(?P<name>[^\[]+?)\s*\[(?P<galaxy>\d+):(?P<system>\d+):(?P<position>\d+)\]\s*(?P<diameter>[\d.,\s\u{a0}\u{202f}]+?)\s*km\s*\((?P<built>\d+)/(?P<total>\d+)\).*?(?P<tmin>-?\d+)\s*°C.*?(?P<tmax>-?\d+)\s*°C",
    )
    .unwrap()
});

static TAG_RGX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static EVENT_ROW_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<tr[^>]*?id="eventRow-(\d+)"([^>]*)>(.*?)</tr>"#).unwrap());

static MISSION_TYPE_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-mission-type="(\d+)""#).unwrap());

static ARRIVAL_TIME_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-arrival-time="(\d+)""#).unwrap());

static COORDS_ORIGIN_RGX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="coordsOrigin"[^>]*>.*?\[(\d+):(\d+):(\d+)\]"#).unwrap()
});

static DEST_COORDS_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)class="destCoords"[^>]*>.*?\[(\d+):(\d+):(\d+)\]"#).unwrap());

static PLAYER_ID_RGX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"data-playerid="(\d+)""#).unwrap());

static MISSILES_RGX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)class="detailsFleet"[^>]*>.*?>([\d.,]+)<"#).unwrap());

static DEFENSE_COUNT_RGX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="defense(\d+)"[^>]*>\s*<span[^>]*?data-value="(\d+)""#).unwrap()
});

/// Extract the in-game session marker from a full page, if present.
pub fn session_token(html: &str) -> Option<String> {
    SESSION_RGX
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Whether a full page carries the in-game session marker.
pub fn is_logged(html: &str) -> bool {
    session_token(html).is_some()
}

/// Parse every planet listed in the overview document.
///
/// Planets carry zeroed resource levels; stock figures come from the
/// separate resources payload.
pub fn parse_planets(html: &str) -> Result<Vec<Planet>> {
    if !is_logged(html) {
        return Err(Error::AuthExpired);
    }

    let matches: Vec<_> = PLANET_DIV_RGX.captures_iter(html).collect();
    let mut planets = Vec::with_capacity(matches.len());

    for (i, caps) in matches.iter().enumerate() {
        let whole = caps.get(0).ok_or_else(|| Error::Parse("planet div".into()))?;
        let id: u64 = caps[1]
            .parse()
            .map_err(|_| Error::Parse(format!("planet id '{}'", &caps[1])))?;

        // The planet's markup runs until the next planet div (or the end of
        // the document for the last one).
        let block_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let block = &html[whole.end()..block_end];

        let title = PLANET_TITLE_RGX
            .captures(block)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| Error::Parse(format!("planet {} has no tooltip", id)))?;

        planets.push(parse_planet_title(PlanetId(id), &title)?);
    }

    Ok(planets)
}

/// Parse one planet, identified by `id`, out of the overview document.
pub fn parse_planet(html: &str, id: PlanetId) -> Result<Planet> {
    parse_planets(html)?
        .into_iter()
        .find(|planet| planet.id == id)
        .ok_or_else(|| Error::Parse(format!("planet {} not present in overview", id)))
}

fn parse_planet_title(id: PlanetId, raw_title: &str) -> Result<Planet> {
    let text = TAG_RGX
        .replace_all(&decode_entities(raw_title), " ")
        .into_owned();

    let caps = PLANET_INFOS_RGX
        .captures(&text)
        .ok_or_else(|| Error::Parse(format!("planet infos: '{}'", text.trim())))?;

    let parse_err = |what: &str| Error::Parse(format!("planet {}: bad {}", id, what));

    Ok(Planet {
        id,
        name: caps["name"].trim().to_string(),
        coordinate: Coordinate {
            galaxy: caps["galaxy"].parse().map_err(|_| parse_err("galaxy"))?,
            system: caps["system"].parse().map_err(|_| parse_err("system"))?,
            position: caps["position"].parse().map_err(|_| parse_err("position"))?,
        },
        diameter: parse_grouped_number(&caps["diameter"]).ok_or_else(|| parse_err("diameter"))?
            as u32,
        fields: Fields {
            built: caps["built"].parse().map_err(|_| parse_err("fields"))?,
            total: caps["total"].parse().map_err(|_| parse_err("fields"))?,
        },
        temperature: Temperature {
            min: caps["tmin"].parse().map_err(|_| parse_err("temperature"))?,
            max: caps["tmax"].parse().map_err(|_| parse_err("temperature"))?,
        },
        resources: Resources::default(),
    })
}

/// Decode the event-box payload into an attack status.
///
/// An absent hostile counter in an otherwise well-formed payload maps to
/// [`AttackStatus::Unknown`] rather than an error: for a security-relevant
/// check an explicit "undetermined" beats a false negative.
pub fn parse_attack_status(raw: &str) -> Result<AttackStatus> {
    let eventbox: EventboxResponse =
        serde_json::from_str(raw).map_err(|e| Error::Parse(format!("event box payload: {}", e)))?;

    Ok(match eventbox.hostile {
        Some(0) => AttackStatus::Safe,
        Some(hostile) => AttackStatus::UnderAttack { hostile },
        None => AttackStatus::Unknown,
    })
}

/// Decode the resources payload for one planet.
pub fn parse_resources(raw: &str) -> Result<Resources> {
    let response: ResourcesResponse =
        serde_json::from_str(raw).map_err(|e| Error::Parse(format!("resources payload: {}", e)))?;

    Ok(Resources {
        metal: response.metal.resources.actual,
        crystal: response.crystal.resources.actual,
        deuterium: response.deuterium.resources.actual,
        energy: response.energy.resources.actual,
    })
}

/// Extract hostile fleet movements from the event-list fragment.
///
/// Friendly and neutral rows are skipped, as are rows whose mission type is
/// not a combat mission. A document without the event-list wrapper yields an
/// empty list when it still carries the session marker, and
/// [`Error::AuthExpired`] when it does not.
pub fn parse_attack_events(html: &str) -> Result<Vec<AttackEvent>> {
    let has_event_list = html.contains("eventListWrap") || html.contains("eventContent");
    if !has_event_list {
        if is_logged(html) {
            return Ok(Vec::new());
        }
        return Err(Error::AuthExpired);
    }

    let mut events = Vec::new();
    for caps in EVENT_ROW_RGX.captures_iter(html) {
        let id: u64 = match caps[1].parse() {
            Ok(id) => id,
            Err(_) => continue,
        };
        let attrs = &caps[2];
        let body = &caps[3];

        let hostile = body.contains("countDown hostile") || body.contains(r#"class="hostile""#);
        if !hostile {
            continue;
        }

        let mission = MISSION_TYPE_RGX
            .captures(attrs)
            .and_then(|m| m[1].parse::<u8>().ok())
            .map(MissionType::from_id);
        let mission = match mission {
            Some(mission) if mission.is_hostile() => mission,
            _ => continue,
        };

        let arrival = ARRIVAL_TIME_RGX
            .captures(attrs)
            .and_then(|m| m[1].parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let arrival = match arrival {
            Some(arrival) => arrival,
            None => continue,
        };

        let origin = match coords_from(&COORDS_ORIGIN_RGX, body) {
            Some(origin) => origin,
            None => continue,
        };
        let destination = match coords_from(&DEST_COORDS_RGX, body) {
            Some(destination) => destination,
            None => continue,
        };

        let attacker_id = PLAYER_ID_RGX
            .captures(body)
            .and_then(|m| m[1].parse::<i64>().ok());

        let missiles = if mission == MissionType::MissileStrike {
            MISSILES_RGX
                .captures(body)
                .and_then(|m| parse_grouped_number(&m[1]))
                .unwrap_or(0) as u32
        } else {
            0
        };

        events.push(AttackEvent {
            id,
            mission,
            origin,
            destination,
            arrival,
            attacker_id,
            missiles,
        });
    }

    Ok(events)
}

/// Extract defensive unit counts from the defenses page.
pub fn parse_defense(html: &str) -> Result<Defense> {
    if !html.contains(r#"id="defense""#) {
        if is_logged(html) {
            return Err(Error::Parse("defenses section not found".into()));
        }
        return Err(Error::AuthExpired);
    }

    let mut defense = Defense::default();
    for caps in DEFENSE_COUNT_RGX.captures_iter(html) {
        let count: u32 = match caps[2].parse() {
            Ok(count) => count,
            Err(_) => continue,
        };
        match &caps[1] {
            "401" => defense.rocket_launcher = count,
            "402" => defense.light_laser = count,
            "403" => defense.heavy_laser = count,
            "404" => defense.gauss_cannon = count,
            "405" => defense.ion_cannon = count,
            "406" => defense.plasma_turret = count,
            "407" => defense.small_shield_dome = count,
            "408" => defense.large_shield_dome = count,
            "502" => defense.anti_ballistic_missile = count,
            "503" => defense.interplanetary_missile = count,
            _ => {}
        }
    }

    Ok(defense)
}

/// Parse an integer rendered with locale grouping ("12.800", "1,200", narrow
/// spaces).
fn parse_grouped_number(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

fn coords_from(rgx: &Regex, body: &str) -> Option<Coordinate> {
    let caps = rgx.captures(body)?;
    Some(Coordinate {
        galaxy: caps[1].parse().ok()?,
        system: caps[2].parse().ok()?,
        position: caps[3].parse().ok()?,
    })
}
