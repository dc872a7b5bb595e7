//! Login rate limiting using a sliding window algorithm.
//!
//! Each client IP gets a bucket of login attempts per window; tokens refill
//! gradually as the window slides.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::AppError;
use crate::config::RateLimitConfig;
use crate::AppState;

/// Entry in the rate limit tracker
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Attempts remaining in the current window
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl RateLimitEntry {
    fn new(max_tokens: u32) -> Self {
        let now = Instant::now();
        Self {
            tokens: max_tokens,
            window_start: now,
            last_request: now,
        }
    }
}

/// Thread-safe per-IP limiter for login attempts
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<IpAddr, RateLimitEntry>,
    config: RateLimitConfig,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            window_duration: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    /// Consume one attempt for `ip`.
    /// Returns Ok(info) if allowed, Err(retry_after_seconds) if limited.
    pub fn check(&self, ip: IpAddr) -> Result<RateLimitInfo, u64> {
        let max_tokens = self.config.login_attempts_per_window;
        if !self.config.enabled {
            return Ok(RateLimitInfo {
                remaining: u32::MAX,
                limit: u32::MAX,
            });
        }

        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(ip)
            .or_insert_with(|| RateLimitEntry::new(max_tokens));

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window_duration {
            entry.tokens = max_tokens;
            entry.window_start = now;
        } else {
            // Sliding window: replenish based on time since the last attempt
            let since_last = now.duration_since(entry.last_request);
            let replenish_rate = max_tokens as f64 / self.window_duration.as_secs_f64();
            let replenished = (since_last.as_secs_f64() * replenish_rate) as u32;
            entry.tokens = entry.tokens.saturating_add(replenished).min(max_tokens);
        }

        entry.last_request = now;

        if entry.tokens > 0 {
            entry.tokens -= 1;
            Ok(RateLimitInfo {
                remaining: entry.tokens,
                limit: max_tokens,
            })
        } else {
            let retry_after = self
                .window_duration
                .saturating_sub(now.duration_since(entry.window_start))
                .as_secs()
                .max(1);
            Err(retry_after)
        }
    }

    /// Drop entries idle for more than two windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let expiry = self.window_duration * 2;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < expiry);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
}

/// Client IP from proxy headers, falling back to loopback
pub fn extract_client_ip(headers: &HeaderMap) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Middleware limiting `POST` submissions of the login form
pub async fn rate_limit_login(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let ip = extract_client_ip(request.headers());
    match state.rate_limiter.check(ip) {
        Ok(info) => {
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(&info.remaining.to_string()) {
                response.headers_mut().insert("X-RateLimit-Remaining", value);
            }
            response
        }
        Err(retry_after) => {
            tracing::warn!(ip = %ip, retry_after, "Login rate limit exceeded");
            let mut response = AppError::rate_limited(format!(
                "Too many login attempts. Try again in {} seconds.",
                retry_after
            ))
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

/// Spawn a background task to periodically clean up expired entries
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>, cleanup_interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(cleanup_interval_secs.max(1));
        loop {
            tokio::time::sleep(interval).await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                "Rate limiter cleanup complete, {} entries remaining",
                rate_limiter.entry_count()
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            login_attempts_per_window: 5,
            window_seconds: 60,
            cleanup_interval: 300,
        }
    }

    #[test]
    fn test_allows_attempts_under_limit() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for i in 0..5 {
            assert!(limiter.check(ip).is_ok(), "Attempt {} should be allowed", i);
        }
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for _ in 0..5 {
            let _ = limiter.check(ip);
        }

        let retry_after = limiter.check(ip).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_different_ips_have_separate_limits() {
        let limiter = RateLimiter::new(test_config());
        let ip1: IpAddr = "192.168.1.1".parse().unwrap();
        let ip2: IpAddr = "192.168.1.2".parse().unwrap();

        for _ in 0..5 {
            let _ = limiter.check(ip1);
        }

        assert!(limiter.check(ip1).is_err());
        assert!(limiter.check(ip2).is_ok());
    }

    #[test]
    fn test_disabled_rate_limiting() {
        let mut config = test_config();
        config.enabled = false;
        let limiter = RateLimiter::new(config);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for _ in 0..100 {
            assert!(limiter.check(ip).is_ok());
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        let _ = limiter.check(ip);
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_extract_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), IpAddr::V4(Ipv4Addr::LOCALHOST));

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.7"));
        assert_eq!(extract_client_ip(&headers), "10.0.0.7".parse::<IpAddr>().unwrap());

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(extract_client_ip(&headers), "203.0.113.9".parse::<IpAddr>().unwrap());
    }
}
