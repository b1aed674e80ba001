//! Mock lobby and game server for integration testing
//!
//! Implements just enough of the backend wire contract to drive the client
//! end to end: lobby authentication, server/account resolution, login
//! links, and the game pages the client queries. Test knobs allow expiring
//! sessions, injecting transient failures, and steering the hostile
//! counter.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use tokio::net::TcpListener;

pub const UNIVERSE: &str = "Uni42";
pub const USERNAME: &str = "alice@example.com";
pub const PASSWORD: &str = "secret";

pub const HOME_PLANET_ID: u64 = 33620;
pub const COLONY_PLANET_ID: u64 = 33621;

/// Mock server state
#[derive(Debug, Clone)]
pub struct MockServerState {
    /// Base URL, filled in once the listener is bound
    base_url: Arc<Mutex<String>>,
    /// Completed login handshakes (login links issued)
    logins: Arc<Mutex<u32>>,
    /// Valid lobby bearer tokens
    lobby_tokens: Arc<Mutex<HashSet<String>>>,
    /// Valid game session tokens
    sessions: Arc<Mutex<HashSet<String>>>,
    /// Hostile counter reported by the event box; `None` omits the field
    hostile: Arc<Mutex<Option<u32>>>,
    /// Remaining game requests to answer with HTTP 503
    failures_left: Arc<Mutex<u32>>,
    /// Monotonic token counter
    counter: Arc<Mutex<u32>>,
}

impl Default for MockServerState {
    fn default() -> Self {
        Self {
            base_url: Arc::new(Mutex::new(String::new())),
            logins: Arc::new(Mutex::new(0)),
            lobby_tokens: Arc::new(Mutex::new(HashSet::new())),
            sessions: Arc::new(Mutex::new(HashSet::new())),
            hostile: Arc::new(Mutex::new(Some(0))),
            failures_left: Arc::new(Mutex::new(0)),
            counter: Arc::new(Mutex::new(0)),
        }
    }
}

impl MockServerState {
    fn next_token(&self, prefix: &str) -> String {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        format!("{}-{}", prefix, counter)
    }
}

/// Mock server implementation
#[derive(Debug, Default)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the mock server and return the lobby URL
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);
        *self.state.base_url.lock().unwrap() = server_url.clone();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
        }

        Ok((self, server_url))
    }

    /// Completed login handshakes so far
    pub fn login_count(&self) -> u32 {
        *self.state.logins.lock().unwrap()
    }

    /// Invalidate every game session server-side
    pub fn expire_sessions(&self) {
        self.state.sessions.lock().unwrap().clear();
    }

    /// Steer the hostile counter; `None` omits it from the event box
    pub fn set_hostile(&self, hostile: Option<u32>) {
        *self.state.hostile.lock().unwrap() = hostile;
    }

    /// Answer the next `n` game requests with HTTP 503
    pub fn fail_next(&self, n: u32) {
        *self.state.failures_left.lock().unwrap() = n;
    }

    fn create_router(&self) -> Router {
        Router::new()
            // Lobby endpoints
            .route("/api/users", post(lobby_login_handler))
            .route("/api/servers", get(servers_handler))
            .route("/api/users/me/accounts", get(accounts_handler))
            .route("/api/users/me/loginLink", get(login_link_handler))
            // Game endpoints
            .route("/game/lobby-login", get(game_entry_handler))
            .route("/game/index.php", get(game_page_handler))
            .with_state(self.state.clone())
    }
}

// Handler functions

async fn lobby_login_handler(
    State(state): State<MockServerState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let email = fields.get("credentials[email]").map(String::as_str);
    let password = fields.get("credentials[password]").map(String::as_str);

    if email != Some(USERNAME) || password != Some(PASSWORD) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = state.next_token("lobby-token");
    state.lobby_tokens.lock().unwrap().insert(token.clone());
    Json(serde_json::json!({ "token": token })).into_response()
}

async fn servers_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!([
        { "number": 142, "name": UNIVERSE, "language": "en" },
        { "number": 17, "name": "Andromeda", "language": "de" }
    ]))
}

async fn accounts_handler(State(state): State<MockServerState>, headers: HeaderMap) -> Response {
    if !bearer_is_valid(&state, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    Json(serde_json::json!([
        { "id": 101, "name": "alice", "server": { "number": 142, "language": "en" } }
    ]))
    .into_response()
}

async fn login_link_handler(State(state): State<MockServerState>, headers: HeaderMap) -> Response {
    if !bearer_is_valid(&state, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let token = state.next_token("game-session");
    state.sessions.lock().unwrap().insert(token.clone());
    *state.logins.lock().unwrap() += 1;

    let base = state.base_url.lock().unwrap().clone();
    Json(serde_json::json!({
        "url": format!("{}/game/lobby-login?token={}", base, token)
    }))
    .into_response()
}

async fn game_entry_handler(
    State(state): State<MockServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = match params.get("token") {
        Some(token) if state.sessions.lock().unwrap().contains(token) => token.clone(),
        _ => return StatusCode::FORBIDDEN.into_response(),
    };

    (
        [
            (header::CONTENT_TYPE, "text/html".to_string()),
            (
                header::SET_COOKIE,
                format!("gamesession={}; Path=/", token),
            ),
        ],
        overview_html(&token),
    )
        .into_response()
}

async fn game_page_handler(
    State(state): State<MockServerState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    {
        let mut failures = state.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    let token = session_from_cookies(&state, &headers);
    let page = params.get("page").map(String::as_str).unwrap_or("");

    if page == "logout" {
        if let Some(token) = token {
            state.sessions.lock().unwrap().remove(&token);
        }
        return html(login_page());
    }

    let token = match token {
        Some(token) => token,
        None => return html(login_page()),
    };

    match page {
        "overview" => html(overview_html(&token)),
        "fetchEventbox" => {
            let body = match *state.hostile.lock().unwrap() {
                Some(hostile) => {
                    serde_json::json!({ "hostile": hostile, "neutral": 0, "friendly": 1 })
                }
                None => serde_json::json!({ "neutral": 0, "friendly": 1 }),
            };
            Json(body).into_response()
        }
        "fetchResources" => Json(serde_json::json!({
            "metal": { "resources": { "actual": 280000, "max": 1060000, "production": 0.55 } },
            "crystal": { "resources": { "actual": 120000, "max": 530000, "production": 0.25 } },
            "deuterium": { "resources": { "actual": 5400, "max": 265000, "production": 0.05 } },
            "energy": { "resources": { "actual": -32 } }
        }))
        .into_response(),
        "eventList" => {
            let hostile = state.hostile.lock().unwrap().unwrap_or(0);
            html(event_list_html(hostile))
        }
        "defenses" => html(defense_html(&token)),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn bearer_is_valid(state: &MockServerState, headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| state.lobby_tokens.lock().unwrap().contains(token))
}

fn session_from_cookies(state: &MockServerState, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = cookies
        .split(';')
        .filter_map(|cookie| cookie.trim().strip_prefix("gamesession="))
        .next()?;

    state
        .sessions
        .lock()
        .unwrap()
        .contains(token)
        .then(|| token.to_string())
}

fn html(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/html")], body).into_response()
}

fn login_page() -> String {
    "<!DOCTYPE html>\n<html><head><title>Log in</title></head>\n\
     <body><form id=\"loginForm\">Please log in</form></body></html>"
        .to_string()
}

fn overview_html(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta name="ogame-session" content="{token}"/>
  <meta name="ogame-timestamp" content="1700000000"/>
</head>
<body id="overview">
  <div id="planetList">
    <div class="smallplanet" id="planet-{home}">
      <a href="/game/index.php?page=overview&cp={home}" class="planetlink"
         title="&lt;b&gt;Homeworld [1:123:7]&lt;/b&gt;&lt;br/&gt;12.800km (163/188)&lt;br&gt;-17°C to 23°C">
        <img class="planetPic" src="planet1.png"/>
        <span class="planet-name">Homeworld</span>
        <span class="planet-koords">[1:123:7]</span>
      </a>
    </div>
    <div class="smallplanet" id="planet-{colony}">
      <a href="/game/index.php?page=overview&cp={colony}" class="planetlink"
         title="&lt;b&gt;Colony [4:208:10]&lt;/b&gt;&lt;br/&gt;8.250km (90/120)&lt;br&gt;52°C to 92°C">
        <img class="planetPic" src="planet2.png"/>
        <span class="planet-name">Colony</span>
        <span class="planet-koords">[4:208:10]</span>
      </a>
    </div>
  </div>
</body>
</html>"#,
        token = token,
        home = HOME_PLANET_ID,
        colony = COLONY_PLANET_ID,
    )
}

fn event_list_html(hostile: u32) -> String {
    let mut rows = String::new();
    for i in 0..hostile {
        rows.push_str(&format!(
            r##"  <tr class="eventFleet" id="eventRow-{id}" data-mission-type="1" data-arrival-time="{arrival}">
    <td class="countDown hostile">10m</td>
    <td class="coordsOrigin"><a href="#">[2:44:8]</a></td>
    <td class="destCoords"><a href="#">[1:123:7]</a></td>
    <td class="sendMail"><a class="sendMail" data-playerid="107432" title="raider"></a></td>
  </tr>
"##,
            id = 100 + i,
            arrival = 1_700_000_600 + u64::from(i) * 60,
        ));
    }

    format!(
        "<div id=\"eventListWrap\">\n<table id=\"eventContent\">\n{}</table>\n</div>",
        rows
    )
}

fn defense_html(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta name="ogame-session" content="{token}"/></head>
<body id="defense">
  <div id="defense">
    <span class="defense401"><span class="amount" data-value="120"></span></span>
    <span class="defense402"><span class="amount" data-value="80"></span></span>
    <span class="defense406"><span class="amount" data-value="4"></span></span>
    <span class="defense407"><span class="amount" data-value="1"></span></span>
    <span class="defense502"><span class="amount" data-value="20"></span></span>
  </div>
</body>
</html>"#,
        token = token,
    )
}
