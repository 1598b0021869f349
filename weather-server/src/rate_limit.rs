//! In-memory per-client rate limiting with a sliding log per key.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Allowed number of requests per rolling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_requests: u32,
    pub period: Duration,
}

impl Quota {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self { max_requests, period: Duration::from_secs(60) }
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.period.as_secs();
        match secs {
            60 => write!(f, "{} per 1 minute", self.max_requests),
            s if s > 60 && s % 60 == 0 => write!(f, "{} per {} minutes", self.max_requests, s / 60),
            s => write!(f, "{} per {} seconds", self.max_requests, s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

/// Limiter for a single route. Cloning shares the counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    quota: Quota,
    /// key -> instants of admitted requests inside the current window, oldest first.
    clients: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(quota: Quota) -> Self {
        Self { quota, clients: Arc::new(DashMap::new()) }
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Instant::now())
    }

    /// The shard lock on `key` is held across prune, compare and push.
    pub fn admit_at(&self, key: &str, now: Instant) -> Admission {
        let period = self.quota.period;
        let max = self.quota.max_requests as usize;

        let mut hits = self.clients.entry(key.to_owned()).or_default();
        while hits.front().is_some_and(|t| now.duration_since(*t) >= period) {
            hits.pop_front();
        }

        if hits.len() < max {
            hits.push_back(now);
            Admission::Allowed { remaining: (max - hits.len()) as u32 }
        } else {
            let oldest = hits.front().copied().unwrap_or(now);
            Admission::Denied { retry_after: period.saturating_sub(now.duration_since(oldest)) }
        }
    }

    /// Drop keys without any admission inside the current window.
    pub fn purge_idle(&self) {
        self.purge_idle_at(Instant::now());
    }

    pub fn purge_idle_at(&self, now: Instant) {
        let period = self.quota.period;
        self.clients
            .retain(|_, hits| hits.back().is_some_and(|t| now.duration_since(*t) < period));
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Key for a request: the peer IP, or with `trust_proxy` the first of
/// X-Real-IP / X-Forwarded-For that parses as an address.
pub fn client_key(peer: SocketAddr, headers: &HeaderMap, trust_proxy: bool) -> String {
    if trust_proxy
        && let Some(ip) = forwarded_ip(headers)
    {
        return ip.to_string();
    }
    peer.ip().to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-real-ip")
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| header("x-forwarded-for")?.split(',').next()?.trim().parse().ok())
}
