//! Authenticated transport to the game server.
//!
//! Every request is paced by a minimum inter-request interval and retried
//! with bounded exponential backoff on transient failures. Session
//! credentials ride on the shared cookie store; a response that no longer
//! carries the in-game session marker is reported as
//! [`Error::AuthExpired`] so the session manager can re-authenticate.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use skywatch_core::parser;
use skywatch_core::{Error, Result};

use crate::session::SessionSnapshot;

/// Tunable pacing and retry limits.
///
/// All thresholds are configuration rather than hard-coded: the backend's
/// actual rate limits are unknown and server-side throttling or bans must be
/// avoided.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    /// Total per-request timeout
    pub timeout: Duration,
    /// Retry ceiling for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub initial_backoff: Duration,
    /// Upper bound for a single backoff delay
    pub max_backoff: Duration,
    /// Minimum spacing between any two requests to the game server
    pub min_interval: Duration,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            min_interval: Duration::from_millis(1000),
        }
    }
}

/// HTTP transport bound to one game session's cookie store.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    policy: RequestPolicy,
    /// Next instant a request may be issued. Claiming a slot moves it
    /// forward by `min_interval`, so callers queue instead of dropping.
    next_slot: Mutex<Instant>,
}

impl Transport {
    /// Create a transport over an existing HTTP client.
    ///
    /// The client must share its cookie store with the session manager,
    /// otherwise requests go out unauthenticated.
    pub fn new(client: Client, policy: RequestPolicy) -> Self {
        Self {
            client,
            policy,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Fetch a full HTML page (e.g. `overview`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExpired`] when the body lacks the in-game
    /// session marker, i.e. the server served the login page instead.
    pub async fn request_page(
        &self,
        session: &SessionSnapshot,
        page: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let body = self.request_raw(session, page, params).await?;
        if !parser::is_logged(&body) {
            debug!(page, "response carries no session marker");
            return Err(Error::AuthExpired);
        }
        Ok(body)
    }

    /// Fetch an ajax HTML fragment (e.g. the event list).
    ///
    /// Fragments carry no session marker of their own; a full document in
    /// their place means the server redirected to the login page.
    pub async fn request_fragment(
        &self,
        session: &SessionSnapshot,
        page: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let body = self.request_raw(session, page, params).await?;
        if body.contains("<html") && !parser::is_logged(&body) {
            debug!(page, "fragment request answered with a login page");
            return Err(Error::AuthExpired);
        }
        Ok(body)
    }

    /// Fetch a JSON endpoint (e.g. the event box).
    ///
    /// The server answers rejected sessions with an HTML login page even on
    /// JSON endpoints, so a body starting with markup is a session failure,
    /// not a parse failure.
    pub async fn request_json(
        &self,
        session: &SessionSnapshot,
        page: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let body = self.request_raw(session, page, params).await?;
        if body.trim_start().starts_with('<') {
            debug!(page, "json request answered with markup");
            return Err(Error::AuthExpired);
        }
        Ok(body)
    }

    /// Issue one authenticated GET with pacing and bounded retries.
    async fn request_raw(
        &self,
        session: &SessionSnapshot,
        page: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let url = format!("{}/game/index.php", session.server_url);
        let mut backoff = self.policy.initial_backoff;
        let mut last_error = String::new();

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = with_jitter(backoff);
                debug!(page, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                backoff = next_backoff(backoff, self.policy.max_backoff);
            }
            self.acquire_slot().await;

            let result = self
                .client
                .get(&url)
                .query(&[("page", page)])
                .query(params)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(Error::AuthExpired);
                    }
                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = format!("HTTP {} from {}", status, page);
                        continue;
                    }
                    if status.is_client_error() {
                        return Err(Error::Fatal(format!("HTTP {} from {}", status, page)));
                    }
                    match response.text().await {
                        Ok(body) => return Ok(body),
                        Err(e) => {
                            last_error = format!("reading body from {}: {}", page, e);
                            continue;
                        }
                    }
                }
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    last_error = e.to_string();
                }
                Err(e) => return Err(Error::Fatal(e.to_string())),
            }
        }

        warn!(page, attempts = self.policy.max_retries + 1, %last_error, "retry budget exhausted");
        Err(Error::Transient {
            attempts: self.policy.max_retries + 1,
            message: last_error,
        })
    }

    /// Claim the next request slot, sleeping until it opens.
    async fn acquire_slot(&self) {
        let deadline = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let deadline = (*slot).max(now);
            *slot = deadline + self.policy.min_interval;
            deadline
        };
        tokio::time::sleep_until(deadline).await;
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

fn with_jitter(delay: Duration) -> Duration {
    let spread = delay.as_millis() as u64 / 5;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_conservative() {
        let policy = RequestPolicy::default();
        assert!(policy.min_interval >= Duration::from_millis(500));
        assert!(policy.max_retries >= 1);
        assert!(policy.initial_backoff < policy.max_backoff);
    }

    #[test]
    fn test_backoff_doubles_up_to_ceiling() {
        let max = Duration::from_secs(4);
        let mut delay = Duration::from_secs(1);
        delay = next_backoff(delay, max);
        assert_eq!(delay, Duration::from_secs(2));
        delay = next_backoff(delay, max);
        assert_eq!(delay, Duration::from_secs(4));
        delay = next_backoff(delay, max);
        assert_eq!(delay, Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_bounded() {
        let base = Duration::from_millis(1000);
        for _ in 0..50 {
            let delayed = with_jitter(base);
            assert!(delayed >= base);
            assert!(delayed <= base + Duration::from_millis(200));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced_by_min_interval() {
        let policy = RequestPolicy {
            min_interval: Duration::from_millis(1000),
            ..Default::default()
        };
        let transport = Transport::new(Client::new(), policy);

        let start = Instant::now();
        transport.acquire_slot().await;
        transport.acquire_slot().await;
        transport.acquire_slot().await;

        // Two full intervals must have elapsed before the third slot opens
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }
}
