//! Fixed-window request limiter keyed by client.
//!
//! # Key invariants
//! - A key admits at most `max_requests` per window; the window restarts on
//!   the first request after it elapses.
//! - The tracked key set is bounded; expired windows are pruned before a new
//!   key is admitted past the bound.
//!
//! # Client identity
//! Requests are keyed by the connection's peer address. `x-forwarded-for` and
//! `x-real-ip` are honored only when the service is configured to sit behind
//! a trusted proxy that overwrites them; otherwise a caller could rotate the
//! headers to open a fresh window per request.
use crate::app::AppState;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use dashmap::DashMap;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

const DEFAULT_MAX_KEYS: usize = 16_384;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    max_keys: usize,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self::with_max_keys(window, max_requests, DEFAULT_MAX_KEYS)
    }

    pub fn with_max_keys(window: Duration, max_requests: u32, max_keys: usize) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            max_requests: max_requests.max(1),
            max_keys: max_keys.max(1),
            windows: DashMap::new(),
        }
    }

    /// Count one request for `key`.
    ///
    /// Returns `Err(retry_after_secs)` when the key is over its limit.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        if !self.windows.contains_key(key) && self.windows.len() >= self.max_keys {
            self.prune(now);
        }
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(entry.started_at);
        if elapsed >= self.window {
            *entry = Window {
                started_at: now,
                count: 0,
            };
        }
        if entry.count >= self.max_requests {
            let remaining = self.window.saturating_sub(elapsed);
            return Err(remaining.as_secs().max(1));
        }
        entry.count += 1;
        Ok(())
    }

    fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.started_at) < self.window);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

const ANONYMOUS_CLIENT: &str = "anonymous";

/// Rate-limit identity of the requesting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(client_key(&parts.headers, peer, state.trust_proxy_headers))
    }
}

/// Resolve the client key: proxy headers first when trusted, then the peer
/// address, else a shared anonymous bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> ClientKey {
    if trust_proxy && let Some(addr) = forwarded_client(headers) {
        return ClientKey::new(addr);
    }
    match peer {
        Some(ip) => ClientKey::new(ip.to_string()),
        None => ClientKey::new(ANONYMOUS_CLIENT),
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}
