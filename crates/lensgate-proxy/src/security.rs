use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::http::{header, HeaderMap, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ProxyConfig;

const MAX_LIMITER_KEYS: usize = 10_000;

#[derive(Clone, Copy)]
struct RateEntry {
    count: u32,
    window_start: Instant,
}

pub struct FixedWindowRateLimiter {
    max_requests: u32,
    window: Duration,
    max_keys: usize,
    entries: Mutex<HashMap<String, RateEntry>>,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            max_requests,
            window,
            max_keys,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter for session initialization, sized from config. A limit of 0 disables it.
    pub fn for_session_init(config: &ProxyConfig) -> Self {
        Self::new(
            config.init_rate_limit,
            config.init_rate_window,
            MAX_LIMITER_KEYS,
        )
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let mut guard = match self.entries.lock() {
            Ok(v) => v,
            Err(_) => return false,
        };

        if guard.len() >= self.max_keys && !guard.contains_key(key) {
            guard.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
            if guard.len() >= self.max_keys {
                return false;
            }
        }

        let entry = guard.entry(key.to_string()).or_insert(RateEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }
}

/// Client address used for rate limiting. Forwarding headers are only honoured
/// when the proxy is configured to sit behind a trusted reverse proxy.
pub fn effective_client_ip(
    headers: &HeaderMap,
    direct_addr: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> IpAddr {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = real_ip {
            return ip;
        }
    }

    direct_addr
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub fn build_cors_layer(config: &ProxyConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors_allow_any {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured; cross-origin browser access will be blocked");
        return base;
    }

    base.allow_origin(AllowOrigin::list(origins))
}
