//! Fixed-window rate limiting for public submission endpoints.
//!
//! Counters are kept in-process in a `DashMap` keyed by route class and client
//! IP. Each key gets `max_requests` per `window_secs`; the window resets when
//! it elapses. A `max_requests` of 0 disables the limit for that class.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::WindowConfig;
use crate::errors::{Error, Result};

/// Checks between opportunistic sweeps of elapsed windows.
const PRUNE_EVERY: usize = 1024;

#[derive(Debug)]
struct WindowState {
    started: Instant,
    window: Duration,
    count: u32,
}

/// Shared limiter, one per application.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(&'static str, String), WindowState>,
    checks: AtomicUsize,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request for `key` in the route class, rejecting it with 429
    /// when the window budget is spent.
    pub fn check(&self, class: &'static str, key: &str, config: &WindowConfig) -> Result<()> {
        if config.max_requests == 0 {
            return Ok(());
        }

        let window = Duration::from_secs(config.window_secs);
        let now = Instant::now();
        let outcome = {
            let mut entry = self.windows.entry((class, key.to_string())).or_insert(WindowState {
                started: now,
                window,
                count: 0,
            });

            if now.duration_since(entry.started) >= window {
                entry.started = now;
                entry.count = 0;
            }
            entry.window = window;

            if entry.count >= config.max_requests {
                tracing::info!(class, key, "rate limit exceeded");
                Err(Error::TooManyRequests {
                    message: "Too many requests, slow down and try again later".to_string(),
                })
            } else {
                entry.count += 1;
                Ok(())
            }
        };

        // The entry guard must be dropped first; retain locks the same shards
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        outcome
    }

    /// Drop windows that have fully elapsed, so the map does not keep an
    /// entry for every client ever seen. Runs from `check` every
    /// `PRUNE_EVERY` calls.
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows.retain(|_, state| now.duration_since(state.started) < state.window);
    }
}

/// Best-effort client IP from proxy headers, falling back to "unknown".
///
/// Takes the first entry of `x-forwarded-for`, then `x-real-ip`. The socket
/// address is not used because the service is expected to sit behind a proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(max_requests: u32, window_secs: u64) -> WindowConfig {
        WindowConfig { max_requests, window_secs }
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let config = window(3, 60);

        for _ in 0..3 {
            assert!(limiter.check("login", "1.2.3.4", &config).is_ok());
        }
        let err = limiter.check("login", "1.2.3.4", &config).unwrap_err();
        assert!(matches!(err, Error::TooManyRequests { .. }));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let config = window(1, 60);

        assert!(limiter.check("comments", "1.1.1.1", &config).is_ok());
        assert!(limiter.check("comments", "2.2.2.2", &config).is_ok());
        assert!(limiter.check("comments", "1.1.1.1", &config).is_err());
    }

    #[test]
    fn test_classes_are_independent() {
        let limiter = RateLimiter::new();
        let config = window(1, 60);

        assert!(limiter.check("login", "1.1.1.1", &config).is_ok());
        assert!(limiter.check("contact", "1.1.1.1", &config).is_ok());
    }

    #[test]
    fn test_zero_max_disables_limit() {
        let limiter = RateLimiter::new();
        let config = window(0, 60);

        for _ in 0..100 {
            assert!(limiter.check("login", "1.2.3.4", &config).is_ok());
        }
    }

    #[test]
    fn test_prune_drops_elapsed_windows() {
        let limiter = RateLimiter::new();
        limiter.check("login", "1.2.3.4", &window(1, 0)).unwrap();
        limiter.check("login", "5.6.7.8", &window(1, 3600)).unwrap();
        assert_eq!(limiter.windows.len(), 2);

        limiter.prune();
        // Only the live window survives
        assert_eq!(limiter.windows.len(), 1);
    }

    #[test]
    fn test_check_sweeps_stale_windows() {
        let limiter = RateLimiter::new();
        let config = window(1, 0);

        // Far more distinct clients than one sweep interval
        for i in 0..(PRUNE_EVERY * 3) {
            let key = format!("10.0.{}.{}", i / 256, i % 256);
            limiter.check("contact", &key, &config).unwrap();
        }

        // Elapsed windows were swept along the way instead of accumulating
        assert!(limiter.windows.len() <= PRUNE_EVERY);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.2");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
