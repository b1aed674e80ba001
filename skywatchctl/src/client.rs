//! Client facade over the session manager, transport, and decoders.
//!
//! This is the public entry point: one [`GameClient`] holds one live
//! session and exposes typed queries over it. All methods take `&self`, so
//! the client can be shared behind an `Arc` and queried concurrently.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use skywatch_core::parser;
use skywatch_core::{AttackEvent, AttackStatus, Defense, Error, Planet, PlanetId, Resources, Result};

use crate::session::{Credentials, SessionManager};
use crate::transport::{RequestPolicy, Transport};

const USER_AGENT: &str = concat!("skywatchctl/", env!("CARGO_PKG_VERSION"));

/// Client construction parameters.
///
/// Numeric thresholds deliberately live in configuration: the backend's
/// retry limits and throttling windows are inferred contracts, not
/// documented ones.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Lobby base URL
    pub lobby_url: String,
    /// How long a session is trusted before re-authenticating
    pub session_lifetime: Duration,
    /// Request pacing and retry limits
    pub policy: RequestPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            lobby_url: "https://lobby.ogame.gameforge.com".to_string(),
            session_lifetime: Duration::from_secs(15 * 60),
            policy: RequestPolicy::default(),
        }
    }
}

/// Session-holding client for one account on one universe.
#[derive(Debug)]
pub struct GameClient {
    session: SessionManager,
    transport: Transport,
}

impl GameClient {
    /// Log in and return a connected client.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] for empty inputs or an unresolvable universe
    /// * [`Error::Auth`] when the lobby rejects the credentials
    /// * [`Error::Transient`] on transport failure
    pub async fn connect(
        universe: &str,
        username: &str,
        password: &str,
        config: ClientConfig,
    ) -> Result<GameClient> {
        let credentials = Credentials {
            universe: universe.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };

        let http = Client::builder()
            .timeout(config.policy.timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {}", e)))?;

        let session = SessionManager::connect(
            http.clone(),
            &config.lobby_url,
            credentials,
            config.session_lifetime,
        )
        .await?;
        let transport = Transport::new(http, config.policy);

        Ok(Self { session, transport })
    }

    /// Fetch one planet's snapshot, including its resource levels.
    ///
    /// On any failure the error is returned alone; no partially-populated
    /// planet is ever handed out.
    pub async fn get_planet(&self, id: PlanetId) -> Result<Planet> {
        let overview = self.fetch_page("overview", &[]).await?;
        let mut planet = parser::parse_planet(&overview, id).map_err(log_drift)?;
        planet.resources = self.get_resources(id).await?;
        Ok(planet)
    }

    /// Fetch all planets from the overview, without per-planet resources.
    pub async fn get_planets(&self) -> Result<Vec<Planet>> {
        let overview = self.fetch_page("overview", &[]).await?;
        parser::parse_planets(&overview).map_err(log_drift)
    }

    /// Poll the event box for hostile fleet movements.
    ///
    /// Returns `Ok(AttackStatus::Unknown)` when the backend answered but
    /// the hostile counter was missing, and `Err` when the fetch itself
    /// failed. Neither case may be read as "safe".
    pub async fn is_under_attack(&self) -> Result<AttackStatus> {
        let body = self.fetch_json("fetchEventbox", &[]).await?;
        let status = parser::parse_attack_status(&body).map_err(log_drift)?;
        if !status.is_known() {
            warn!("event box carried no hostile counter; reporting unknown");
        }
        Ok(status)
    }

    /// List incoming hostile fleet movements with full details.
    pub async fn get_attacks(&self) -> Result<Vec<AttackEvent>> {
        let body = self
            .fetch_fragment("eventList", &[("ajax", "1".to_string())])
            .await?;
        // The transport already vetted the session; a marker-less body here
        // is schema drift, not expiry.
        parser::parse_attack_events(&body)
            .map_err(|e| match e {
                Error::AuthExpired => Error::Parse("event list without wrapper".into()),
                other => other,
            })
            .map_err(log_drift)
    }

    /// Fetch the current resource levels of one planet.
    pub async fn get_resources(&self, id: PlanetId) -> Result<Resources> {
        let body = self
            .fetch_json("fetchResources", &[("cp", id.to_string())])
            .await?;
        parser::parse_resources(&body).map_err(log_drift)
    }

    /// Fetch the defensive unit counts of one planet.
    pub async fn get_defense(&self, id: PlanetId) -> Result<Defense> {
        let body = self
            .fetch_page("defenses", &[("cp", id.to_string())])
            .await?;
        parser::parse_defense(&body).map_err(log_drift)
    }

    /// Log out and invalidate the session. Later queries fail with
    /// [`Error::NotConnected`].
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    // Each fetch helper runs the query against a validated session and, on
    // the server rejecting that session, performs exactly one refresh and
    // one retry of the original request.

    async fn fetch_page(&self, page: &str, params: &[(&str, String)]) -> Result<String> {
        let snapshot = self.session.ensure_valid().await?;
        match self.transport.request_page(&snapshot, page, params).await {
            Err(Error::AuthExpired) => {
                debug!(page, "session rejected; refreshing once");
                let fresh = self.session.refresh(&snapshot).await?;
                self.transport
                    .request_page(&fresh, page, params)
                    .await
                    .map_err(second_rejection)
            }
            other => other,
        }
    }

    async fn fetch_fragment(&self, page: &str, params: &[(&str, String)]) -> Result<String> {
        let snapshot = self.session.ensure_valid().await?;
        match self
            .transport
            .request_fragment(&snapshot, page, params)
            .await
        {
            Err(Error::AuthExpired) => {
                debug!(page, "session rejected; refreshing once");
                let fresh = self.session.refresh(&snapshot).await?;
                self.transport
                    .request_fragment(&fresh, page, params)
                    .await
                    .map_err(second_rejection)
            }
            other => other,
        }
    }

    async fn fetch_json(&self, page: &str, params: &[(&str, String)]) -> Result<String> {
        let snapshot = self.session.ensure_valid().await?;
        match self.transport.request_json(&snapshot, page, params).await {
            Err(Error::AuthExpired) => {
                debug!(page, "session rejected; refreshing once");
                let fresh = self.session.refresh(&snapshot).await?;
                self.transport
                    .request_json(&fresh, page, params)
                    .await
                    .map_err(second_rejection)
            }
            other => other,
        }
    }
}

/// A session rejected immediately after a successful refresh is an account
/// problem, not an expiry.
fn second_rejection(err: Error) -> Error {
    match err {
        Error::AuthExpired => Error::Auth("session rejected right after re-authentication".into()),
        other => other,
    }
}

/// Parse failures indicate backend schema drift; log them distinctly so
/// operators can tell them apart from network noise.
fn log_drift(err: Error) -> Error {
    if let Error::Parse(ref detail) = err {
        warn!(target: "skywatch::schema", %detail, "backend schema drift");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.lobby_url.starts_with("https://"));
        assert_eq!(config.session_lifetime, Duration::from_secs(900));
    }

    #[test]
    fn test_second_rejection_maps_expiry_to_auth() {
        assert!(matches!(
            second_rejection(Error::AuthExpired),
            Error::Auth(_)
        ));
        assert!(matches!(
            second_rejection(Error::Parse("x".into())),
            Error::Parse(_)
        ));
    }
}
