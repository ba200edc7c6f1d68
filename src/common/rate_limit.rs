//! Limite de requisições em memória por janela deslizante.
//!
//! Usado no login (por e-mail), no formulário público de contato e nas
//! chamadas de IA (por usuário).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::common::error::AppError;

#[derive(Debug, thiserror::Error)]
#[error("limite excedido (máx. {limit} requisições/{window_secs}s)")]
pub struct RateLimitError {
    pub limit: usize,
    pub window_secs: u64,
}

impl From<RateLimitError> for AppError {
    fn from(_: RateLimitError) -> Self {
        AppError::RateLimited
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    pub fn check_and_record(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(key, Instant::now())
    }

    fn check_and_record_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        // Remove chaves ociosas para o mapa não crescer sem limite.
        inner.retain(|_, hits| {
            prune_window(hits, now, self.window);
            !hits.is_empty()
        });

        let hits = inner.entry(key.to_string()).or_default();
        if hits.len() >= self.limit {
            return Err(RateLimitError {
                limit: self.limit,
                window_secs: self.window.as_secs(),
            });
        }
        hits.push_back(now);
        Ok(())
    }
}

fn prune_window(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = hits.front() {
        if now.duration_since(front) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_per_key() {
        let rl = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..3 {
            assert!(rl.check_and_record_at("ana@example.com", now).is_ok(), "tentativa {i}");
        }
        assert!(rl.check_and_record_at("ana@example.com", now).is_err());
        assert!(rl.check_and_record_at("bia@example.com", now).is_ok());
    }

    #[test]
    fn window_expiry_allows_new_requests() {
        let rl = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        rl.check_and_record_at("k", start).unwrap();
        assert!(rl.check_and_record_at("k", start + Duration::from_secs(30)).is_err());
        assert!(rl.check_and_record_at("k", start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn maps_to_rate_limited_app_error() {
        let err: AppError = RateLimitError { limit: 1, window_secs: 60 }.into();
        assert_eq!(err.code(), "rate_limited");
    }
}
