//! Per-name circuit breaker guarding calls to unreliable external
//! dependencies (the embedder and the LLM).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::CircuitBreakerConfig;

/// The three states a circuit breaker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Calls proceed normally.
    Closed,
    /// Calls are short-circuited immediately.
    Open,
    /// A single probe call is allowed through to decide whether to close
    /// or re-open.
    HalfOpen,
}

/// A snapshot of circuit breaker state suitable for persistence across
/// restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// The breaker's name (e.g. `"embedder"`, `"llm"`).
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures observed while closed.
    pub consecutive_failures: u32,
    /// Seconds since the Unix epoch when the breaker opened, if open.
    pub opened_at_unix: Option<i64>,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// A named circuit breaker: `closed -> open -> half_open -> closed`.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        })
    }

    /// Restores a breaker from persisted state, re-deriving `Open` vs
    /// `HalfOpen` from the elapsed time since it was persisted, if
    /// `elapsed_since_open` is supplied.
    #[must_use]
    pub fn restore(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        persisted: &PersistedState,
    ) -> Arc<Self> {
        let breaker = Self::new(name, config);
        {
            let mut inner = breaker.inner.lock();
            inner.state = persisted.state;
            inner.consecutive_failures = persisted.consecutive_failures;
            if persisted.state == CircuitState::Open {
                inner.opened_at = Some(Instant::now());
            }
        }
        breaker
    }

    /// The breaker's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether a call should be allowed through right now,
    /// transitioning `Open -> HalfOpen` once the recovery timeout has
    /// elapsed.
    #[must_use]
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= Duration::from_secs(self.config.recovery_timeout_seconds) {
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful call: closes the breaker and resets the
    /// failure counter.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Records a failed call: in `HalfOpen`, re-opens immediately; in
    /// `Closed`, opens once `failure_threshold` consecutive failures have
    /// accumulated.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// A snapshot suitable for persistence.
    #[must_use]
    pub fn snapshot(&self) -> PersistedState {
        let inner = self.inner.lock();
        PersistedState {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at_unix: inner
                .opened_at
                .map(|_| chrono::Utc::now().timestamp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout_seconds: 600,
        }
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("embedder", config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_in_closed_resets_failure_count() {
        let breaker = CircuitBreaker::new("embedder", config());
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(
            "embedder",
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout_seconds: 0,
            },
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_success_closes() {
        let breaker = CircuitBreaker::new(
            "llm",
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout_seconds: 0,
            },
        );
        breaker.record_failure();
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
