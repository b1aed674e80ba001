//! Session lifecycle against the game lobby.
//!
//! The manager owns the only mutable session value in the system. It runs
//! the lobby handshake (credentials → bearer token → server resolution →
//! account → one-shot login link), tracks an expiry estimate, and
//! re-authenticates on demand. At most one re-authentication is ever in
//! flight: parallel logins can trip the lobby's abuse detection and lock
//! the account.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use skywatch_core::api::{Account, LoginLinkResponse, Server, TokenResponse};
use skywatch_core::parser;
use skywatch_core::{Error, Result};

/// Login inputs, supplied once at connect time and retained only for
/// re-authentication.
#[derive(Clone)]
pub struct Credentials {
    /// Public universe name, e.g. "Uni42"
    pub universe: String,
    /// Lobby account email
    pub username: String,
    /// Lobby account password
    pub password: String,
}

impl Credentials {
    /// Validate that no field is empty.
    pub fn validate(&self) -> Result<()> {
        if self.universe.trim().is_empty() {
            return Err(Error::Config("universe name is empty".into()));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Config("username is empty".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password is empty".into()));
        }
        Ok(())
    }
}

// Keep the password out of logs and error chains.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("universe", &self.universe)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable per-request view of the live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Base URL of the resolved game server
    pub server_url: String,
    /// In-game session token
    pub token: String,
}

/// The live session, owned exclusively by the manager.
#[derive(Debug)]
struct Session {
    server_url: String,
    token: String,
    expires_at: Instant,
}

impl Session {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            server_url: self.server_url.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Active(Session),
    /// Re-authentication itself was rejected; terminal.
    AuthFailed,
    /// Explicit logout; terminal.
    LoggedOut,
}

/// Owns the login lifecycle for one account on one universe.
#[derive(Debug)]
pub struct SessionManager {
    http: Client,
    lobby_url: String,
    credentials: Credentials,
    lifetime: Duration,
    state: RwLock<SessionState>,
    /// Serializes re-authentication. Held across the whole lobby handshake.
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    /// Perform the initial login and return a manager holding an active
    /// session.
    ///
    /// # Errors
    ///
    /// * [`Error::Auth`] when the lobby rejects the credentials or no
    ///   account exists on the universe
    /// * [`Error::Config`] when the universe name does not resolve
    /// * [`Error::Transient`] on transport failure
    pub async fn connect(
        http: Client,
        lobby_url: &str,
        credentials: Credentials,
        lifetime: Duration,
    ) -> Result<Self> {
        credentials.validate()?;

        let manager = Self {
            http,
            lobby_url: lobby_url.trim_end_matches('/').to_string(),
            credentials,
            lifetime,
            state: RwLock::new(SessionState::LoggedOut),
            refresh_lock: Mutex::new(()),
        };

        let session = manager.login().await?;
        *manager.state.write().await = SessionState::Active(session);
        Ok(manager)
    }

    /// Return a snapshot of the live session, re-authenticating first if
    /// the expiry estimate has elapsed.
    pub async fn ensure_valid(&self) -> Result<SessionSnapshot> {
        {
            let state = self.state.read().await;
            match &*state {
                SessionState::Active(session) if Instant::now() < session.expires_at => {
                    return Ok(session.snapshot());
                }
                SessionState::Active(_) => {}
                SessionState::AuthFailed | SessionState::LoggedOut => {
                    return Err(Error::NotConnected);
                }
            }
        }
        self.reauthenticate(None).await
    }

    /// Re-authenticate after the server rejected `stale`.
    ///
    /// Idempotent under concurrency: callers that arrive while a refresh is
    /// in flight wait for it and receive the replacement session instead of
    /// triggering another login.
    pub async fn refresh(&self, stale: &SessionSnapshot) -> Result<SessionSnapshot> {
        self.reauthenticate(Some(&stale.token)).await
    }

    /// Best-effort logout; the manager is unusable afterwards.
    pub async fn logout(&self) {
        let snapshot = {
            let state = self.state.read().await;
            match &*state {
                SessionState::Active(session) => Some(session.snapshot()),
                _ => None,
            }
        };

        if let Some(snapshot) = snapshot {
            let url = format!("{}/game/index.php", snapshot.server_url);
            if let Err(e) = self.http.get(&url).query(&[("page", "logout")]).send().await {
                debug!(error = %e, "logout request failed");
            }
        }

        *self.state.write().await = SessionState::LoggedOut;
        info!("logged out");
    }

    async fn reauthenticate(&self, stale_token: Option<&str>) -> Result<SessionSnapshot> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        {
            let state = self.state.read().await;
            match &*state {
                SessionState::Active(session) => {
                    let replaced = stale_token.is_some_and(|token| token != session.token);
                    let fresh = stale_token.is_none() && Instant::now() < session.expires_at;
                    if replaced || fresh {
                        return Ok(session.snapshot());
                    }
                }
                SessionState::AuthFailed | SessionState::LoggedOut => {
                    return Err(Error::NotConnected);
                }
            }
        }

        info!("re-authenticating session");
        match self.login().await {
            Ok(session) => {
                let snapshot = session.snapshot();
                *self.state.write().await = SessionState::Active(session);
                Ok(snapshot)
            }
            Err(err) => {
                // Rejected credentials make the manager terminally failed;
                // transient failures leave the expired session in place so a
                // later call can try again.
                if matches!(err, Error::Auth(_) | Error::Config(_)) {
                    warn!(error = %err, "re-authentication rejected");
                    *self.state.write().await = SessionState::AuthFailed;
                }
                Err(err)
            }
        }
    }

    /// Run the full lobby handshake and land in the game.
    async fn login(&self) -> Result<Session> {
        debug!(lobby = %self.lobby_url, "requesting lobby token");
        let response = self
            .http
            .post(format!("{}/api/users", self.lobby_url))
            .form(&[
                ("kid", ""),
                ("language", "en"),
                ("autologin", "false"),
                ("credentials[email]", self.credentials.username.as_str()),
                ("credentials[password]", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(net_error)?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::CONFLICT
        ) {
            return Err(Error::Auth("bad credentials".into()));
        }
        check_status(status, "lobby sessions")?;
        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::Parse(format!("lobby token payload: {}", e)))?
            .token;

        let server = self.resolve_universe().await?;
        let account = self.find_account(&token, &server).await?;

        debug!(account = account.id, server = server.number, "requesting login link");
        let response = self
            .http
            .get(format!("{}/api/users/me/loginLink", self.lobby_url))
            .bearer_auth(&token)
            .query(&[
                ("id", account.id.to_string()),
                ("server[number]", server.number.to_string()),
                ("server[language]", server.language.clone()),
            ])
            .send()
            .await
            .map_err(net_error)?;
        check_status(response.status(), "login link")?;
        let link = response
            .json::<LoginLinkResponse>()
            .await
            .map_err(|e| Error::Parse(format!("login link payload: {}", e)))?;

        let server_url = origin_of(&link.url)?;
        let page = self
            .http
            .get(&link.url)
            .send()
            .await
            .map_err(net_error)?
            .text()
            .await
            .map_err(net_error)?;

        let game_token = parser::session_token(&page)
            .ok_or_else(|| Error::Auth("login link did not establish a game session".into()))?;

        info!(universe = %server.name, server = server.number, "session established");
        Ok(Session {
            server_url,
            token: game_token,
            expires_at: Instant::now() + self.lifetime,
        })
    }

    /// Resolve the configured universe name to a game server.
    async fn resolve_universe(&self) -> Result<Server> {
        let response = self
            .http
            .get(format!("{}/api/servers", self.lobby_url))
            .send()
            .await
            .map_err(net_error)?;
        check_status(response.status(), "server list")?;
        let servers = response
            .json::<Vec<Server>>()
            .await
            .map_err(|e| Error::Parse(format!("server list payload: {}", e)))?;

        let wanted = self.credentials.universe.trim();
        servers
            .into_iter()
            .find(|server| server.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::Config(format!("universe '{}' not found", wanted)))
    }

    /// Find the account tied to the resolved server.
    async fn find_account(&self, token: &str, server: &Server) -> Result<Account> {
        let response = self
            .http
            .get(format!("{}/api/users/me/accounts", self.lobby_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(net_error)?;
        check_status(response.status(), "account list")?;
        let accounts = response
            .json::<Vec<Account>>()
            .await
            .map_err(|e| Error::Parse(format!("account list payload: {}", e)))?;

        accounts
            .into_iter()
            .find(|account| {
                account.server.number == server.number
                    && account.server.language == server.language
            })
            .ok_or_else(|| Error::Auth(format!("no account on universe '{}'", server.name)))
    }
}

/// Map a transport-level failure during the handshake.
fn net_error(err: reqwest::Error) -> Error {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        Error::Transient {
            attempts: 1,
            message: err.to_string(),
        }
    } else {
        Error::Fatal(err.to_string())
    }
}

fn check_status(status: StatusCode, what: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error() {
        return Err(Error::Transient {
            attempts: 1,
            message: format!("HTTP {} from {}", status, what),
        });
    }
    Err(Error::Fatal(format!("HTTP {} from {}", status, what)))
}

/// Strip a URL down to its `scheme://authority` origin.
fn origin_of(url: &str) -> Result<String> {
    let scheme_end = url
        .find("://")
        .ok_or_else(|| Error::Parse(format!("login link '{}' has no scheme", url)))?;
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    if rest[..authority_end].is_empty() {
        return Err(Error::Parse(format!("login link '{}' has no host", url)));
    }
    Ok(url[..scheme_end + 3 + authority_end].to_string())
}
