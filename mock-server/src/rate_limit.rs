//! Sliding-window throttle for the auth endpoints, keyed by client address.

use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;

/// Attempts allowed per client within `AUTH_RATE_WINDOW`.
pub const AUTH_RATE_LIMIT: usize = 10;
pub const AUTH_RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct RateLimiter {
    attempts: HashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Record an attempt by `client` at `now`, or refuse it when the client
    /// already used its budget for the current window.
    pub fn check(&mut self, client: &str, now: Instant) -> Result<(), AppError> {
        let attempts = self.attempts.entry(client.to_string()).or_default();
        while attempts
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= AUTH_RATE_WINDOW)
        {
            attempts.pop_front();
        }
        if attempts.len() >= AUTH_RATE_LIMIT {
            return Err(AppError::RateLimited);
        }
        attempts.push_back(now);
        Ok(())
    }
}

/// Peer IP of the request, or `unknown` when the server was started without
/// connection info (router tests).
#[derive(Clone, Debug)]
pub struct ClientAddr(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientAddr(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_attempt_in_window_is_refused() {
        let mut limiter = RateLimiter::default();
        let start = Instant::now();
        for i in 0..AUTH_RATE_LIMIT {
            let at = start + Duration::from_secs(i as u64);
            assert!(limiter.check("10.0.0.1", at).is_ok(), "attempt {i}");
        }
        let err = limiter
            .check("10.0.0.1", start + Duration::from_secs(30))
            .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[test]
    fn clients_have_separate_budgets() {
        let mut limiter = RateLimiter::default();
        let now = Instant::now();
        for _ in 0..AUTH_RATE_LIMIT {
            limiter.check("10.0.0.1", now).unwrap();
        }
        assert!(limiter.check("10.0.0.1", now).is_err());
        assert!(limiter.check("10.0.0.2", now).is_ok());
    }

    #[test]
    fn window_slides() {
        let mut limiter = RateLimiter::default();
        let start = Instant::now();
        for _ in 0..AUTH_RATE_LIMIT {
            limiter.check("c", start).unwrap();
        }
        assert!(limiter.check("c", start + AUTH_RATE_WINDOW - Duration::from_secs(1)).is_err());
        assert!(limiter.check("c", start + AUTH_RATE_WINDOW).is_ok());
    }
}
